//! Tolerant CAMM-GL tokeniser
//!
//! A hand-written scanner with one state per command family: two-letter
//! mnemonics with `;`-terminated numeric arguments, the text-bearing
//! `LB`/`WD` terminated by the current escape byte, `DT` (which changes
//! that escape byte mid-stream), `!`-prefixed commands terminated by
//! newline, `ESC.X` device control, and single-letter mode-1 legacy
//! commands.  Anything else becomes a bad-input token for the caller to
//! report.

use crate::error::{CamError, Result};

/// One scanned token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Two-letter mnemonic with numeric arguments (`PA1,2;`).
    Command { mnemonic: String, args: Vec<f64> },
    /// Text-bearing command (`LB`, `WD`), terminated by the escape byte.
    Text { mnemonic: String, text: String },
    /// `DT` set-escape command.
    SetEscape(char),
    /// `!XX` command with newline-terminated arguments.
    Bang { mnemonic: String, args: Vec<f64> },
    /// `ESC.X` device control with optional `:`-terminated arguments.
    Device { code: char, args: Vec<String> },
    /// Single-letter mode-1 legacy command.
    Legacy { letter: char, args: Vec<f64> },
    /// Unparseable input; whitespace-only runs are silently tolerable.
    Bad(String),
}

impl Token {
    /// True for a bad token that is only whitespace or control bytes (a
    /// header's out-of-spec device-reset byte included).
    pub fn is_silent(&self) -> bool {
        matches!(self, Token::Bad(text)
            if text.chars().all(|c| c.is_whitespace() || c.is_ascii_control()))
    }
}

const ESC: char = '\u{1b}';

/// Scan a whole CAMM-GL stream into tokens.  Fails hard only on an
/// unterminated text command.
pub fn tokenise(input: &str) -> Result<Vec<Token>> {
    let mut scanner = Scanner::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = scanner.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    escape: char,
    source: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            chars: input.chars().collect(),
            pos: 0,
            escape: '\u{3}',
            source: input,
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        let Some(c) = self.peek(0) else {
            return Ok(None);
        };

        if c == ESC {
            return self.scan_device().map(Some);
        }
        if c == '!' {
            return Ok(Some(self.scan_bang()));
        }
        if c.is_ascii_uppercase() {
            if matches!(self.peek(1), Some(n) if n.is_ascii_uppercase()) {
                return self.scan_two_letter().map(Some);
            }
            return Ok(Some(self.scan_legacy()));
        }
        Ok(Some(self.scan_bad()))
    }

    /// `ESC . X [args :]`
    fn scan_device(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1; // ESC
        if self.peek(0) != Some('.') {
            return Ok(self.bad_since(start));
        }
        self.pos += 1;
        let Some(code) = self.peek(0) else {
            return Ok(self.bad_since(start));
        };
        self.pos += 1;

        // Arguments, when present, run to a ':'.
        let mut args = Vec::new();
        let arg_start = self.pos;
        let mut scan = self.pos;
        while let Some(c) = self.chars.get(scan).copied() {
            if c == ':' {
                let raw: String = self.chars[arg_start..scan].iter().collect();
                args = raw
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                self.pos = scan + 1;
                break;
            }
            if !(c.is_ascii_digit() || matches!(c, ';' | ' ' | '\t' | '-' | '+')) {
                break;
            }
            scan += 1;
        }
        Ok(Token::Device { code, args })
    }

    /// `!XX args \n`
    fn scan_bang(&mut self) -> Token {
        let start = self.pos;
        self.pos += 1;
        let mut mnemonic = String::new();
        for _ in 0..2 {
            match self.peek(0) {
                Some(c) if c.is_ascii_uppercase() => {
                    mnemonic.push(c);
                    self.pos += 1;
                }
                _ => return self.bad_since(start),
            }
        }
        let arg_start = self.pos;
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
        let raw: String = self.chars[arg_start..self.pos].iter().collect();
        if self.peek(0) == Some('\n') {
            self.pos += 1;
        }
        match parse_args(&raw) {
            Ok(args) => Token::Bang { mnemonic, args },
            Err(_) => self.bad_since(start),
        }
    }

    fn scan_two_letter(&mut self) -> Result<Token> {
        let start = self.pos;
        let mnemonic: String = self.chars[self.pos..self.pos + 2].iter().collect();
        self.pos += 2;

        if mnemonic == "LB" || mnemonic == "WD" {
            return self.scan_text(mnemonic);
        }
        if mnemonic == "DT" {
            let Some(escape) = self.peek(0) else {
                return Ok(self.bad_since(start));
            };
            self.pos += 1;
            if matches!(self.peek(0), Some(';') | Some('\n')) {
                self.pos += 1;
            }
            self.escape = escape;
            return Ok(Token::SetEscape(escape));
        }

        let raw = self.scan_arg_run();
        match parse_args(&raw) {
            Ok(args) => Ok(Token::Command { mnemonic, args }),
            Err(_) => Ok(self.bad_since(start)),
        }
    }

    /// Consume an argument run up to its `;` terminator (or the start of
    /// the next command when the terminator is missing).
    fn scan_arg_run(&mut self) -> String {
        let arg_start = self.pos;
        let mut end = self.pos;
        while let Some(c) = self.peek(0) {
            if c == ';' {
                end = self.pos;
                self.pos += 1;
                return self.chars[arg_start..end].iter().collect();
            }
            if c == '\n' || c == '!' || c == ESC || c.is_ascii_uppercase() {
                break;
            }
            self.pos += 1;
            end = self.pos;
        }
        self.chars[arg_start..end].iter().collect()
    }

    /// Text argument running to the current escape byte.
    fn scan_text(&mut self, mnemonic: String) -> Result<Token> {
        let text_start = self.pos;
        while let Some(c) = self.peek(0) {
            if c == self.escape {
                let text: String = self.chars[text_start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(Token::Text { mnemonic, text });
            }
            self.pos += 1;
        }
        Err(CamError::Parse(format!(
            "unterminated {} command in '{}'",
            mnemonic,
            truncate(self.source)
        )))
    }

    /// Mode-1 single-letter command with optional numeric arguments.
    fn scan_legacy(&mut self) -> Token {
        let start = self.pos;
        let letter = self.chars[self.pos];
        self.pos += 1;
        let raw = self.scan_arg_run();
        match parse_args(&raw) {
            Ok(args) => Token::Legacy { letter, args },
            Err(_) => self.bad_since(start),
        }
    }

    /// Consume until something that could start a command.
    fn scan_bad(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_uppercase() || c == '!' || c == ESC {
                break;
            }
            self.pos += 1;
        }
        self.bad_since(start)
    }

    fn bad_since(&mut self, start: usize) -> Token {
        if self.pos == start {
            self.pos += 1;
        }
        Token::Bad(self.chars[start..self.pos].iter().collect())
    }
}

fn parse_args(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| CamError::BadInput(format!("'{s}' is not a number")))
        })
        .collect()
}

fn truncate(s: &str) -> String {
    s.chars().take(40).collect()
}
