use std::{path::PathBuf, rc::Rc, sync::{atomic::{AtomicUsize, Ordering}, Arc, RwLock}};

use termcolor::Buffer;

use crate::binder::error::BindWarning;
use super::diagnostic::{Diagnostic, Label, Level, Location};

pub trait WarningEmitterIO {
    fn emit_warning(&self, warning: Warning);
}

#[derive(Debug, Clone, Copy)]
pub struct NullWarningEmitterIO;

impl WarningEmitterIO for NullWarningEmitterIO {
    fn emit_warning(&self, _warning: Warning) {}
}

/// Collects warnings for inspection, mostly by tests.
#[derive(Debug, Default, Clone)]
pub struct VectorWarningEmitterIO {
    pub warnings: Arc<RwLock<Vec<Warning>>>
}

impl VectorWarningEmitterIO {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Warning> {
        match self.warnings.write() {
            Ok(mut warnings) => std::mem::take(&mut *warnings),
            Err(_) => vec![],
        }
    }
}

impl WarningEmitterIO for VectorWarningEmitterIO {
    fn emit_warning(&self, warning: Warning) {
        if let Ok(mut warnings) = self.warnings.write() {
            warnings.push(warning);
        }
    }
}

pub struct WarningEmitter {
    count: Arc<AtomicUsize>,
    emitter: Rc<dyn WarningEmitterIO>
}

impl WarningEmitter {
    pub fn new(emitter: Rc<dyn WarningEmitterIO>) -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            emitter,
        }
    }

    pub fn null() -> Self {
        Self::new(Rc::new(NullWarningEmitterIO))
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    pub fn emit(&self, warning: Warning) {
        _ = self.count.fetch_add(1, Ordering::Relaxed);
        self.emitter.emit_warning(warning);
    }
}

/// Attaches the module being bound to binder warnings.
pub struct BindWarningEmitter {
    module_path: PathBuf,
    module_src: String,
    emitter: WarningEmitter,
}

impl BindWarningEmitter {
    pub fn new(
        module_path: PathBuf,
        module_src: String,
        emitter: WarningEmitter
    ) -> Self {
        Self {
            module_path,
            module_src,
            emitter,
        }
    }

    pub fn null() -> Self {
        Self::new(PathBuf::new(), String::new(), WarningEmitter::null())
    }

    pub fn count(&self) -> usize {
        self.emitter.count()
    }

    pub fn emit(&self, warning: BindWarning) {
        self.emitter.emit(Warning::Bind {
            path: self.module_path.clone(),
            src: self.module_src.clone(),
            warning,
        });
    }
}

#[derive(Debug, Clone)]
pub enum Warning {
    Bind {
        path: PathBuf,
        src: String,
        warning: BindWarning
    }
}

impl Warning {
    pub fn pretty_string(&self) -> String {
        let mut nocolor = Buffer::no_color();
        // writing into memory cannot fail
        let _ = self.pretty(&mut nocolor);
        String::from_utf8_lossy(nocolor.as_slice()).into_owned()
    }

    pub fn pretty(&self, buf: &mut Buffer) -> std::io::Result<()> {
        use std::io::Write;

        self.to_diagnostic().write(buf)?;
        buf.write_all(b"\n")
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let Warning::Bind { path, src, warning } = self;

        let (title, label) = match warning {
            BindWarning::UnusedBinding { name, .. } => (
                "Unused binding",
                format!("`{name}` is never used"),
            ),
            BindWarning::ShadowedPrelude { name, .. } => (
                "Shadowed prelude definition",
                format!("This replaces the prelude's `{name}`"),
            ),
        };

        Diagnostic {
            title: title.into(),
            text: "".into(),
            level: Level::Warning,
            location: Some(Location {
                src,
                path: path.to_path_buf(),
                label: Label {
                    text: Some(label),
                    span: warning.location(),
                },
                extra_labels: vec![]
            }),
        }
    }
}
