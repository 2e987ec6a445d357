use std::fmt::Display;

use super::error::{LexicalError, LexicalErrorType};
use super::token::{is_punctuation, is_symbol_char, unicode_alias, Token};
use crate::utils::prelude::SrcSpan;

pub type Spanned = (u32, Token, u32);
pub type LexResult = std::result::Result<Spanned, LexicalError>;

#[derive(Debug)]
pub struct Lexer<T: Iterator<Item = (u32, char)>> {
	position: u32,
	next_position: u32,
	ch: Option<char>,
	next_ch: Option<char>,
	input: T,

	line_start: bool,
}

impl<T: Iterator<Item = (u32, char)>> Display for Lexer<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f,
			"Lexer {{\n\tposition: {},\n\tnext_position: {},\n\tch: {:?}, next_ch: {:?}\n}}",
			self.position, self.next_position, self.ch, self.next_ch
		)
	}
}

impl<T: Iterator<Item = (u32, char)>> Lexer<T> {
	pub fn new(input: T) -> Self {
		let mut lexer = Self {
			position: 0,
			next_position: 0,
			ch: None,
			next_ch: None,
			input,

			line_start: true,
		};

		lexer.next_char();
		lexer.next_char();

		lexer
	}

	/// The first call reports the indentation of the first non-blank line,
	/// every line break afterwards reports the width of the next one.
	pub fn next_token(&mut self) -> LexResult {
		if self.line_start {
			self.line_start = false;
			return self.lex_indentation();
		}

		while let Some(' ' | '\t' | '\r' | '\x0C') = self.ch {
			self.next_char();
		}

		let Some(ch) = self.ch else {
			return Ok(self.eof());
		};

		match ch {
			'\n' => {
				self.next_char();
				self.lex_indentation()
			},
			'-' if self.next_ch == Some('-') => {
				self.skip_comment();
				self.next_token()
			},
			'"' => self.lex_string(),
			'\'' => self.lex_char(),
			'0'..='9' => self.lex_number(),
			ch => match unicode_alias(ch) {
				Some(alias) => Ok(self.eat_one_char(Token::Operator(alias.to_string()))),
				None if ch.is_alphabetic() || ch == '_' => Ok(self.lex_name()),
				None if is_punctuation(ch) => Ok(self.eat_one_char(Token::Operator(ch.to_string()))),
				None if is_symbol_char(ch) => Ok(self.lex_operator()),
				None if !ch.is_ascii() && !ch.is_control() && !ch.is_whitespace() => {
					Ok(self.eat_one_char(Token::Operator(ch.to_string())))
				},
				None => {
					let location = self.position;
					Err(LexicalError {
						error: LexicalErrorType::UnrecognizedToken { tok: ch },
						location: SrcSpan::from(location, location + ch.len_utf8() as u32),
					})
				}
			}
		}
	}

	fn next_char(&mut self) -> Option<char> {
		let ch = self.ch;

		let next = match self.input.next() {
			Some((pos, ch)) => {
				self.position = self.next_position;
				self.next_position = pos;

				Some(ch)
			},
			None => {
				self.position = self.next_position;
				self.next_position += self.next_ch.map(|ch| ch.len_utf8() as u32).unwrap_or(1);

				None
			}
		};

		self.ch = self.next_ch;
		self.next_ch = next;

		ch
	}

	fn eof(&self) -> Spanned {
		(self.position, Token::Eof, self.position)
	}

	fn eat_one_char(&mut self, token: Token) -> Spanned {
		let start_pos = self.position;
		self.next_char();
		let end_pos = self.position;

		(start_pos, token, end_pos)
	}

	fn lex_indentation(&mut self) -> LexResult {
		loop {
			let mut width = 0;

			loop {
				match self.ch {
					Some(' ') => width += 1,
					Some('\r') => {},
					Some('\t') => {
						return Err(LexicalError {
							error: LexicalErrorType::TabIndentation,
							location: SrcSpan::from(self.position, self.position + 1),
						})
					},
					_ => break,
				}
				self.next_char();
			}

			match self.ch {
				None => return Ok(self.eof()),
				Some('\n') => {
					self.next_char();
				},
				Some('-') if self.next_ch == Some('-') => self.skip_comment(),
				Some(_) => return Ok((self.position, Token::Newline(width), self.position)),
			}
		}
	}

	fn skip_comment(&mut self) {
		while !matches!(self.ch, Some('\n') | None) {
			self.next_char();
		}
	}

	fn lex_name(&mut self) -> Spanned {
		let start_pos = self.position;
		let mut name = String::new();

		while let Some(ch) = self.ch {
			if !(ch.is_alphanumeric() || ch == '_' || ch == '\'') {
				break;
			}
			name.push(ch);
			self.next_char();
		}

		(start_pos, Token::Name(name), self.position)
	}

	fn lex_operator(&mut self) -> Spanned {
		let start_pos = self.position;
		let mut operator = String::new();

		while let Some(ch) = self.ch {
			if !is_symbol_char(ch) {
				break;
			}
			operator.push(ch);
			self.next_char();
		}

		(start_pos, Token::Operator(operator), self.position)
	}

	fn lex_number(&mut self) -> LexResult {
		let start_pos = self.position;

		let radix = match (self.ch, self.next_ch) {
			(Some('0'), Some('x' | 'X')) => 16,
			(Some('0'), Some('o' | 'O')) => 8,
			(Some('0'), Some('b' | 'B')) => 2,
			_ => 10,
		};

		if radix != 10 {
			self.next_char();
			self.next_char();
		}

		let mut value: Option<i64> = Some(0);
		let mut digits = 0;
		let mut out_of_radix = false;

		while let Some(ch) = self.ch {
			if !(ch.is_alphanumeric() || ch == '_') {
				break;
			}
			self.next_char();

			if ch == '_' {
				continue;
			}

			match ch.to_digit(radix) {
				Some(digit) => {
					digits += 1;
					value = value
						.and_then(|value| value.checked_mul(radix as i64))
						.and_then(|value| value.checked_add(digit as i64));
				},
				None => out_of_radix = true,
			}
		}

		let location = SrcSpan::from(start_pos, self.position);

		if out_of_radix || digits == 0 {
			return Err(LexicalError { error: LexicalErrorType::DigitOutOfRadix, location });
		}

		match value {
			Some(value) => Ok((start_pos, Token::Int(value), self.position)),
			None => Err(LexicalError { error: LexicalErrorType::IntegerOutOfRange, location }),
		}
	}

	/// Every escape spells one byte.
	fn lex_escape(&mut self) -> Result<u8, LexicalError> {
		let start_pos = self.position;
		self.next_char(); // skip backslash

		let escaped = match self.next_char() {
			Some('n') => b'\n',
			Some('t') => b'\t',
			Some('r') => b'\r',
			Some('0') => 0,
			Some('\\') => b'\\',
			Some('"') => b'"',
			Some('\'') => b'\'',
			Some('x') => {
				let high = self.next_char().and_then(|ch| ch.to_digit(16));
				let low = self.next_char().and_then(|ch| ch.to_digit(16));

				match (high, low) {
					(Some(high), Some(low)) => (high * 16 + low) as u8,
					_ => return Err(LexicalError {
						error: LexicalErrorType::InvalidEscape { ch: 'x' },
						location: SrcSpan::from(start_pos, self.position),
					}),
				}
			},
			Some(ch) => return Err(LexicalError {
				error: LexicalErrorType::InvalidEscape { ch },
				location: SrcSpan::from(start_pos, self.position),
			}),
			None => return Err(LexicalError {
				error: LexicalErrorType::UnterminatedString,
				location: SrcSpan::from(start_pos, self.position),
			}),
		};

		Ok(escaped)
	}

	fn lex_string(&mut self) -> LexResult {
		let start_pos = self.position;
		self.next_char(); // skip opening quote

		// escapes are single bytes, source characters keep their UTF-8 encoding
		let mut value = vec![];

		loop {
			match self.ch {
				Some('"') => {
					self.next_char();
					break;
				},
				Some('\\') => value.push(self.lex_escape()?),
				Some('\n') | None => {
					return Err(LexicalError {
						error: LexicalErrorType::UnterminatedString,
						location: SrcSpan::from(start_pos, self.position),
					})
				},
				Some(ch) => {
					let mut buffer = [0; 4];
					value.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
					self.next_char();
				}
			}
		}

		Ok((start_pos, Token::Str(value), self.position))
	}

	fn lex_char(&mut self) -> LexResult {
		let start_pos = self.position;
		self.next_char(); // skip opening quote

		let value = match self.ch {
			Some('\'') => {
				self.next_char();
				return Err(LexicalError {
					error: LexicalErrorType::EmptyChar,
					location: SrcSpan::from(start_pos, self.position),
				})
			},
			Some('\\') => char::from(self.lex_escape()?),
			Some(ch) if ch != '\n' => {
				self.next_char();
				ch
			},
			_ => {
				return Err(LexicalError {
					error: LexicalErrorType::UnterminatedChar,
					location: SrcSpan::from(start_pos, self.position),
				})
			}
		};

		if self.ch != Some('\'') {
			return Err(LexicalError {
				error: LexicalErrorType::UnterminatedChar,
				location: SrcSpan::from(start_pos, self.position),
			});
		}
		self.next_char();

		Ok((start_pos, Token::Char(value), self.position))
	}
}

impl<T: Iterator<Item = (u32, char)>> Iterator for Lexer<T> {
	type Item = LexResult;

	fn next(&mut self) -> Option<Self::Item> {
		let token = self.next_token();

		Some(token)
	}
}
