use std::fmt::Display;

/// Primitive operations the evaluator performs natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Put,
    Get,
    Abort,
}

impl Builtin {
    pub const ALL: [Builtin; 14] = [
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::Mod,
        Builtin::Eq,
        Builtin::Ne,
        Builtin::Lt,
        Builtin::Le,
        Builtin::Gt,
        Builtin::Ge,
        Builtin::Put,
        Builtin::Get,
        Builtin::Abort,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Mod => "%",
            Builtin::Eq => "==",
            Builtin::Ne => "!=",
            Builtin::Lt => "<",
            Builtin::Le => "<=",
            Builtin::Gt => ">",
            Builtin::Ge => ">=",
            Builtin::Put => "put",
            Builtin::Get => "get",
            Builtin::Abort => "abort",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Builtin::Put | Builtin::Get | Builtin::Abort => 1,
            _ => 2,
        }
    }

    /// `abort` receives its message unevaluated; every other argument is
    /// forced to an integer first.
    pub fn is_strict(&self) -> bool {
        !matches!(self, Builtin::Abort)
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if super::tag::is_symbolic(self.name()) {
            write!(f, "({})", self.name())
        } else {
            write!(f, "{}", self.name())
        }
    }
}
