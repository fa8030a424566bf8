use crate::ast::Position;
use std::fmt;
use std::str::Chars;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // Identifiers and keywords
    Identifier(String),
    Keyword(Keyword),

    // Literals
    NumericLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    NullLiteral,
    RegExpLiteral { pattern: String, flags: String },

    // Template literals: (cooked, raw). Cooked is None for invalid escapes, which only tagged
    // templates accept.
    NoSubstitutionTemplate(Option<String>, String),
    TemplateHead(Option<String>, String),
    TemplateMiddle(Option<String>, String),
    TemplateTail(Option<String>, String),

    // Punctuators
    LeftBrace,                // {
    RightBrace,               // }
    LeftParen,                // (
    RightParen,               // )
    LeftBracket,              // [
    RightBracket,             // ]
    Dot,                      // .
    Ellipsis,                 // ...
    Semicolon,                // ;
    Comma,                    // ,
    LessThan,                 // <
    GreaterThan,              // >
    LessThanEqual,            // <=
    GreaterThanEqual,         // >=
    Equal,                    // ==
    NotEqual,                 // !=
    StrictEqual,              // ===
    StrictNotEqual,           // !==
    Plus,                     // +
    Minus,                    // -
    Star,                     // *
    Percent,                  // %
    Exponent,                 // **
    Increment,                // ++
    Decrement,                // --
    LeftShift,                // <<
    RightShift,               // >>
    UnsignedRightShift,       // >>>
    Ampersand,                // &
    Pipe,                     // |
    Caret,                    // ^
    Bang,                     // !
    Tilde,                    // ~
    LogicalAnd,               // &&
    LogicalOr,                // ||
    NullishCoalescing,        // ??
    Question,                 // ?
    OptionalChain,            // ?.
    Colon,                    // :
    Assign,                   // =
    PlusAssign,               // +=
    MinusAssign,              // -=
    StarAssign,               // *=
    PercentAssign,            // %=
    ExponentAssign,           // **=
    LeftShiftAssign,          // <<=
    RightShiftAssign,         // >>=
    UnsignedRightShiftAssign, // >>>=
    AmpersandAssign,          // &=
    PipeAssign,               // |=
    CaretAssign,              // ^=
    LogicalAndAssign,         // &&=
    LogicalOrAssign,          // ||=
    NullishAssign,            // ??=
    Arrow,                    // =>
    Slash,                    // /
    SlashAssign,              // /=
    Hash,                     // #

    // Special
    LineTerminator,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "{name}"),
            Token::Keyword(kw) => write!(f, "{kw}"),
            Token::NumericLiteral(n) => write!(f, "{}", crate::types::number_ops::to_string(*n)),
            Token::StringLiteral(s) => write!(f, "{s:?}"),
            Token::BooleanLiteral(b) => write!(f, "{b}"),
            Token::NullLiteral => f.write_str("null"),
            Token::RegExpLiteral { pattern, flags } => write!(f, "/{pattern}/{flags}"),
            Token::NoSubstitutionTemplate(..) | Token::TemplateHead(..) => f.write_str("`"),
            Token::TemplateMiddle(..) | Token::TemplateTail(..) => f.write_str("}"),
            Token::LineTerminator => f.write_str("line terminator"),
            Token::Eof => f.write_str("end of input"),
            punct => f.write_str(punct.punctuator()),
        }
    }
}

impl Token {
    fn punctuator(&self) -> &'static str {
        match self {
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Dot => ".",
            Token::Ellipsis => "...",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::LessThan => "<",
            Token::GreaterThan => ">",
            Token::LessThanEqual => "<=",
            Token::GreaterThanEqual => ">=",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::StrictEqual => "===",
            Token::StrictNotEqual => "!==",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Percent => "%",
            Token::Exponent => "**",
            Token::Increment => "++",
            Token::Decrement => "--",
            Token::LeftShift => "<<",
            Token::RightShift => ">>",
            Token::UnsignedRightShift => ">>>",
            Token::Ampersand => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Bang => "!",
            Token::Tilde => "~",
            Token::LogicalAnd => "&&",
            Token::LogicalOr => "||",
            Token::NullishCoalescing => "??",
            Token::Question => "?",
            Token::OptionalChain => "?.",
            Token::Colon => ":",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::PercentAssign => "%=",
            Token::ExponentAssign => "**=",
            Token::LeftShiftAssign => "<<=",
            Token::RightShiftAssign => ">>=",
            Token::UnsignedRightShiftAssign => ">>>=",
            Token::AmpersandAssign => "&=",
            Token::PipeAssign => "|=",
            Token::CaretAssign => "^=",
            Token::LogicalAndAssign => "&&=",
            Token::LogicalOrAssign => "||=",
            Token::NullishAssign => "??=",
            Token::Arrow => "=>",
            Token::Slash => "/",
            Token::SlashAssign => "/=",
            Token::Hash => "#",
            _ => "",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    Instanceof,
    Let,
    New,
    Return,
    Super,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Var,
    Void,
    While,
    With,
    Yield,
}

impl Keyword {
    pub fn from_str(s: &str) -> Option<Keyword> {
        Some(match s {
            "break" => Keyword::Break,
            "case" => Keyword::Case,
            "catch" => Keyword::Catch,
            "class" => Keyword::Class,
            "const" => Keyword::Const,
            "continue" => Keyword::Continue,
            "debugger" => Keyword::Debugger,
            "default" => Keyword::Default,
            "delete" => Keyword::Delete,
            "do" => Keyword::Do,
            "else" => Keyword::Else,
            "enum" => Keyword::Enum,
            "export" => Keyword::Export,
            "extends" => Keyword::Extends,
            "finally" => Keyword::Finally,
            "for" => Keyword::For,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "instanceof" => Keyword::Instanceof,
            "let" => Keyword::Let,
            "new" => Keyword::New,
            "return" => Keyword::Return,
            "super" => Keyword::Super,
            "switch" => Keyword::Switch,
            "this" => Keyword::This,
            "throw" => Keyword::Throw,
            "try" => Keyword::Try,
            "typeof" => Keyword::Typeof,
            "var" => Keyword::Var,
            "void" => Keyword::Void,
            "while" => Keyword::While,
            "with" => Keyword::With,
            "yield" => Keyword::Yield,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Break => "break",
            Keyword::Case => "case",
            Keyword::Catch => "catch",
            Keyword::Class => "class",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Debugger => "debugger",
            Keyword::Default => "default",
            Keyword::Delete => "delete",
            Keyword::Do => "do",
            Keyword::Else => "else",
            Keyword::Enum => "enum",
            Keyword::Export => "export",
            Keyword::Extends => "extends",
            Keyword::Finally => "finally",
            Keyword::For => "for",
            Keyword::Function => "function",
            Keyword::If => "if",
            Keyword::Import => "import",
            Keyword::In => "in",
            Keyword::Instanceof => "instanceof",
            Keyword::Let => "let",
            Keyword::New => "new",
            Keyword::Return => "return",
            Keyword::Super => "super",
            Keyword::Switch => "switch",
            Keyword::This => "this",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Typeof => "typeof",
            Keyword::Var => "var",
            Keyword::Void => "void",
            Keyword::While => "while",
            Keyword::With => "with",
            Keyword::Yield => "yield",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.message, self.position)
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Chars<'a>,
    current: Option<char>,
    offset: usize,
    line: u32,
    column: u32,
    token_start: usize,
    token_position: Position,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            source,
            chars,
            current,
            offset: 0,
            line: 1,
            column: 0,
            token_start: 0,
            token_position: Position { line: 1, column: 0 },
        }
    }

    /// Byte offset just past the last token read.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset where the last token read starts.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Source text between two byte offsets.
    pub fn source_slice(&self, start: usize, end: usize) -> &'a str {
        self.source.get(start..end).unwrap_or("")
    }

    pub fn token_position(&self) -> Position {
        self.token_position
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.current
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current;
        if let Some(c) = ch {
            self.offset += c.len_utf8();
            self.column += 1;
            self.current = self.chars.next();
        }
        ch
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn eat_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            position: self.position(),
        }
    }

    fn is_line_terminator(ch: char) -> bool {
        matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
    }

    fn is_whitespace(ch: char) -> bool {
        matches!(ch, '\t' | '\u{000B}' | '\u{000C}' | ' ' | '\u{00A0}' | '\u{FEFF}')
            || ch.is_whitespace() && !Self::is_line_terminator(ch)
    }

    fn is_identifier_start(ch: char) -> bool {
        ch == '_' || ch == '$' || unicode_ident::is_xid_start(ch)
    }

    fn is_identifier_continue(ch: char) -> bool {
        ch == '$' || ch == '\u{200C}' || ch == '\u{200D}' || unicode_ident::is_xid_continue(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_whitespace(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if Self::is_line_terminator(ch) {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<bool, LexError> {
        let mut has_line_terminator = false;
        loop {
            match self.advance() {
                Some('*') => {
                    if self.eat_char('/') {
                        return Ok(has_line_terminator);
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    has_line_terminator = true;
                    self.handle_newline(ch);
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated comment")),
            }
        }
    }

    fn handle_newline(&mut self, ch: char) {
        if ch == '\r' && self.peek() == Some('\n') {
            self.advance();
        }
        self.line += 1;
        self.column = 0;
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string constant")),
                Some(ch) if ch == quote => return Ok(s),
                Some(ch) if ch == '\n' || ch == '\r' => {
                    return Err(self.error("Unterminated string constant"));
                }
                Some('\\') => {
                    let esc = self.read_escape_sequence()?;
                    s.push_str(&esc);
                }
                Some(ch) => s.push(ch),
            }
        }
    }

    fn read_escape_sequence(&mut self) -> Result<String, LexError> {
        match self.advance() {
            None => Err(self.error("Unterminated string constant")),
            Some('n') => Ok("\n".to_string()),
            Some('r') => Ok("\r".to_string()),
            Some('t') => Ok("\t".to_string()),
            Some('b') => Ok("\u{0008}".to_string()),
            Some('f') => Ok("\u{000C}".to_string()),
            Some('v') => Ok("\u{000B}".to_string()),
            Some(ch @ '0'..='7') => {
                if ch == '0' && !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    return Ok("\0".to_string());
                }
                // Legacy octal escape: up to three digits, value at most 0o377.
                let mut val = ch as u32 - '0' as u32;
                if let Some(d) = self.peek().and_then(|c| c.to_digit(8)) {
                    self.advance();
                    val = val * 8 + d;
                    if ch <= '3'
                        && let Some(d) = self.peek().and_then(|c| c.to_digit(8))
                    {
                        self.advance();
                        val = val * 8 + d;
                    }
                }
                Ok(char::from_u32(val).map(String::from).unwrap_or_default())
            }
            Some('8' | '9') => Err(self.error("Invalid escape sequence")),
            Some('x') => {
                let hi = self.advance().and_then(hex_val);
                let lo = self.advance().and_then(hex_val);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        Ok(char::from_u32(hi * 16 + lo).map(String::from).unwrap_or_default())
                    }
                    _ => Err(self.error("Bad character escape sequence")),
                }
            }
            Some('u') => self.read_unicode_escape(),
            Some(ch) if Self::is_line_terminator(ch) => {
                self.handle_newline(ch);
                Ok(String::new())
            }
            Some(ch) => Ok(ch.to_string()),
        }
    }

    /// Reads the part of a `\u` escape after the `u`. Surrogate pairs written as two escapes
    /// are combined; a lone surrogate becomes U+FFFD since strings are UTF-8 here.
    fn read_unicode_escape(&mut self) -> Result<String, LexError> {
        let code = self.read_code_point()?;
        if (0xD800..0xDC00).contains(&code)
            && self.peek() == Some('\\')
            && self.peek_next() == Some('u')
        {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let low: String = lookahead.take(4).collect();
            if low.len() == 4
                && low.chars().all(|c| c.is_ascii_hexdigit())
                && let Ok(low) = u32::from_str_radix(&low, 16)
                && (0xDC00..0xE000).contains(&low)
            {
                for _ in 0..6 {
                    self.advance();
                }
                let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                return Ok(char::from_u32(combined).map(String::from).unwrap_or_default());
            }
        }
        Ok(char::from_u32(code).unwrap_or('\u{FFFD}').to_string())
    }

    fn read_code_point(&mut self) -> Result<u32, LexError> {
        if self.eat_char('{') {
            let mut val: u32 = 0;
            let mut digits = 0;
            loop {
                match self.advance() {
                    Some('}') if digits > 0 => return Ok(val),
                    Some(ch) => {
                        let d = hex_val(ch).ok_or_else(|| self.error("Bad character escape sequence"))?;
                        val = val * 16 + d;
                        if val > 0x10FFFF {
                            return Err(self.error("Code point out of bounds"));
                        }
                        digits += 1;
                    }
                    None => return Err(self.error("Bad character escape sequence")),
                }
            }
        }
        let mut val: u32 = 0;
        for _ in 0..4 {
            let d = self
                .advance()
                .and_then(hex_val)
                .ok_or_else(|| self.error("Bad character escape sequence"))?;
            val = val * 16 + d;
        }
        Ok(val)
    }

    fn read_numeric_literal(&mut self, first: char) -> Result<Token, LexError> {
        if first == '0' {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                return self.read_radix_literal(radix);
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.read_legacy_octal_or_decimal();
            }
        }

        let mut s = String::new();
        s.push(first);
        if first != '.' {
            self.read_decimal_digits(&mut s)?;
            if self.peek() == Some('.') {
                s.push('.');
                self.advance();
            }
        }
        self.read_decimal_digits(&mut s)?;
        self.read_exponent(&mut s)?;
        self.finish_number(&s)
    }

    fn read_exponent(&mut self, s: &mut String) -> Result<(), LexError> {
        if let Some(e @ ('e' | 'E')) = self.peek() {
            s.push(e);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                s.push(sign);
                self.advance();
            }
            let before = s.len();
            self.read_decimal_digits(s)?;
            if s.len() == before {
                return Err(self.error("Invalid number"));
            }
        }
        Ok(())
    }

    /// Digits with `_` separators; the separators are dropped from `s`.
    fn read_decimal_digits(&mut self, s: &mut String) -> Result<(), LexError> {
        let mut last_was_digit = s.ends_with(|c: char| c.is_ascii_digit());
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                last_was_digit = true;
            } else if ch == '_' && last_was_digit && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                last_was_digit = false;
            } else {
                break;
            }
            self.advance();
        }
        Ok(())
    }

    fn finish_number(&mut self, s: &str) -> Result<Token, LexError> {
        if self.peek() == Some('n') {
            return Err(self.error("BigInt literals are not supported"));
        }
        if self.peek().is_some_and(|c| Self::is_identifier_start(c) || c.is_ascii_digit()) {
            return Err(self.error("Identifier directly after number"));
        }
        let val: f64 = s.parse().map_err(|_| self.error("Invalid number"))?;
        Ok(Token::NumericLiteral(val))
    }

    fn read_radix_literal(&mut self, radix: u32) -> Result<Token, LexError> {
        let mut val = 0f64;
        let mut digits = 0;
        let mut last_was_digit = false;
        while let Some(ch) = self.peek() {
            if let Some(d) = ch.to_digit(radix) {
                val = val * radix as f64 + d as f64;
                digits += 1;
                last_was_digit = true;
            } else if ch == '_' && last_was_digit && self.peek_next().is_some_and(|c| c.is_digit(radix)) {
                last_was_digit = false;
            } else {
                break;
            }
            self.advance();
        }
        if digits == 0 {
            return Err(self.error(format!("Expected number in radix {radix}")));
        }
        self.finish_number_value(val)
    }

    fn finish_number_value(&mut self, val: f64) -> Result<Token, LexError> {
        if self.peek() == Some('n') {
            return Err(self.error("BigInt literals are not supported"));
        }
        if self.peek().is_some_and(Self::is_identifier_start) {
            return Err(self.error("Identifier directly after number"));
        }
        Ok(Token::NumericLiteral(val))
    }

    /// `0` followed by digits: legacy octal when every digit is below 8, else decimal.
    fn read_legacy_octal_or_decimal(&mut self) -> Result<Token, LexError> {
        let mut s = String::from("0");
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            s.push(ch);
            self.advance();
        }
        if s.chars().all(|c| c < '8') {
            let val = s[1..].chars().fold(0f64, |acc, c| acc * 8.0 + (c as u32 - '0' as u32) as f64);
            return self.finish_number_value(val);
        }
        if self.peek() == Some('.') {
            s.push('.');
            self.advance();
            self.read_decimal_digits(&mut s)?;
        }
        self.read_exponent(&mut s)?;
        self.finish_number(&s)
    }

    fn read_identifier(&mut self, first: char) -> Result<Token, LexError> {
        let mut name = String::new();
        let mut escaped = false;
        let mut ch = Some(first);
        loop {
            match ch {
                Some('\\') => {
                    if !self.eat_char('u') {
                        return Err(self.error("Expecting Unicode escape sequence \\uXXXX"));
                    }
                    let code = self.read_code_point()?;
                    let c = char::from_u32(code)
                        .filter(|&c| {
                            if name.is_empty() {
                                Self::is_identifier_start(c)
                            } else {
                                Self::is_identifier_continue(c)
                            }
                        })
                        .ok_or_else(|| self.error("Invalid Unicode escape"))?;
                    name.push(c);
                    escaped = true;
                }
                Some(c) => name.push(c),
                None => break,
            }
            match self.peek() {
                Some(c) if c == '\\' || Self::is_identifier_continue(c) => {
                    self.advance();
                    ch = Some(c);
                }
                _ => break,
            }
        }

        if escaped {
            if Keyword::from_str(&name).is_some() || matches!(name.as_str(), "true" | "false" | "null") {
                return Err(self.error("Keyword must not contain escaped characters"));
            }
            return Ok(Token::Identifier(name));
        }
        Ok(match name.as_str() {
            "true" => Token::BooleanLiteral(true),
            "false" => Token::BooleanLiteral(false),
            "null" => Token::NullLiteral,
            _ => match Keyword::from_str(&name) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Identifier(name),
            },
        })
    }

    /// Reads a regular expression body after the opening `/` (and `prefix`, the `=` of a `/=`
    /// token the parser re-reads as a regex).
    pub fn lex_regex(&mut self, prefix: &str) -> Result<Token, LexError> {
        let mut pattern = String::from(prefix);
        let mut in_class = false;
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated regular expression")),
                Some(ch) if Self::is_line_terminator(ch) => {
                    return Err(self.error("Unterminated regular expression"));
                }
                Some('/') if !in_class => break,
                Some(ch) => {
                    match ch {
                        '[' => in_class = true,
                        ']' => in_class = false,
                        '\\' => {
                            pattern.push(ch);
                            match self.advance() {
                                Some(c) if !Self::is_line_terminator(c) => pattern.push(c),
                                _ => return Err(self.error("Unterminated regular expression")),
                            }
                            continue;
                        }
                        _ => {}
                    }
                    pattern.push(ch);
                }
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if !Self::is_identifier_continue(c) {
                break;
            }
            if !"dgimsuyv".contains(c) || flags.contains(c) {
                return Err(self.error("Invalid regular expression flag"));
            }
            flags.push(c);
            self.advance();
        }
        Ok(Token::RegExpLiteral { pattern, flags })
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            self.token_start = self.offset;
            self.token_position = self.position();

            let ch = match self.peek() {
                None => return Ok(Token::Eof),
                Some(ch) => ch,
            };

            if Self::is_line_terminator(ch) {
                self.advance();
                self.handle_newline(ch);
                return Ok(Token::LineTerminator);
            }

            if ch == '/' {
                if self.peek_next() == Some('/') {
                    self.skip_line_comment();
                    continue;
                }
                if self.peek_next() == Some('*') {
                    self.advance();
                    self.advance();
                    if self.skip_block_comment()? {
                        return Ok(Token::LineTerminator);
                    }
                    continue;
                }
            }

            // Hashbang
            if ch == '#' && self.offset == 0 && self.peek_next() == Some('!') {
                self.skip_line_comment();
                continue;
            }

            self.advance();

            if ch == '\'' || ch == '"' {
                return self.read_string(ch).map(Token::StringLiteral);
            }
            if ch == '`' {
                return self.read_template_literal();
            }
            if ch.is_ascii_digit() || ch == '.' && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.read_numeric_literal(ch);
            }
            if ch == '\\' || Self::is_identifier_start(ch) {
                return self.read_identifier(ch);
            }
            return self.read_punctuator(ch);
        }
    }

    /// Returns (cooked, raw, is_tail). `is_tail` is true when the chunk ended with a backtick
    /// rather than `${`.
    fn read_template_chars(&mut self) -> Result<(Option<String>, String, bool), LexError> {
        let mut cooked = Some(String::new());
        let mut raw = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated template")),
                Some('`') => return Ok((cooked, raw, true)),
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    return Ok((cooked, raw, false));
                }
                Some('\\') => {
                    raw.push('\\');
                    let before = self.offset;
                    let escape = self.read_escape_sequence();
                    raw.push_str(&self.source[before..self.offset].replace("\r\n", "\n"));
                    match escape {
                        Ok(esc) => {
                            if let Some(c) = cooked.as_mut() {
                                c.push_str(&esc);
                            }
                        }
                        Err(_) => cooked = None,
                    }
                }
                Some(ch) if Self::is_line_terminator(ch) => {
                    let normalized = if ch == '\r' { '\n' } else { ch };
                    self.handle_newline(ch);
                    raw.push(normalized);
                    if let Some(c) = cooked.as_mut() {
                        c.push(normalized);
                    }
                }
                Some(ch) => {
                    raw.push(ch);
                    if let Some(c) = cooked.as_mut() {
                        c.push(ch);
                    }
                }
            }
        }
    }

    fn read_template_literal(&mut self) -> Result<Token, LexError> {
        let (cooked, raw, is_tail) = self.read_template_chars()?;
        if is_tail {
            Ok(Token::NoSubstitutionTemplate(cooked, raw))
        } else {
            Ok(Token::TemplateHead(cooked, raw))
        }
    }

    /// Continues a template after the `}` closing a substitution.
    pub fn read_template_continuation(&mut self) -> Result<Token, LexError> {
        let (cooked, raw, is_tail) = self.read_template_chars()?;
        if is_tail {
            Ok(Token::TemplateTail(cooked, raw))
        } else {
            Ok(Token::TemplateMiddle(cooked, raw))
        }
    }

    /// Picks `with_eq` when the next char is `=`, else `plain`.
    fn with_assign(&mut self, plain: Token, with_eq: Token) -> Token {
        if self.eat_char('=') { with_eq } else { plain }
    }

    fn read_punctuator(&mut self, ch: char) -> Result<Token, LexError> {
        Ok(match ch {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '[' => Token::LeftBracket,
            ']' => Token::RightBracket,
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '~' => Token::Tilde,
            ':' => Token::Colon,
            '#' => Token::Hash,
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    Token::Ellipsis
                } else {
                    Token::Dot
                }
            }
            '?' => {
                if self.eat_char('?') {
                    self.with_assign(Token::NullishCoalescing, Token::NullishAssign)
                } else if self.peek() == Some('.') && !self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                    Token::OptionalChain
                } else {
                    Token::Question
                }
            }
            '<' => {
                if self.eat_char('<') {
                    self.with_assign(Token::LeftShift, Token::LeftShiftAssign)
                } else {
                    self.with_assign(Token::LessThan, Token::LessThanEqual)
                }
            }
            '>' => {
                if self.eat_char('>') {
                    if self.eat_char('>') {
                        self.with_assign(Token::UnsignedRightShift, Token::UnsignedRightShiftAssign)
                    } else {
                        self.with_assign(Token::RightShift, Token::RightShiftAssign)
                    }
                } else {
                    self.with_assign(Token::GreaterThan, Token::GreaterThanEqual)
                }
            }
            '=' => {
                if self.eat_char('>') {
                    Token::Arrow
                } else if self.eat_char('=') {
                    self.with_assign(Token::Equal, Token::StrictEqual)
                } else {
                    Token::Assign
                }
            }
            '!' => {
                if self.eat_char('=') {
                    self.with_assign(Token::NotEqual, Token::StrictNotEqual)
                } else {
                    Token::Bang
                }
            }
            '+' => {
                if self.eat_char('+') {
                    Token::Increment
                } else {
                    self.with_assign(Token::Plus, Token::PlusAssign)
                }
            }
            '-' => {
                if self.eat_char('-') {
                    Token::Decrement
                } else {
                    self.with_assign(Token::Minus, Token::MinusAssign)
                }
            }
            '*' => {
                if self.eat_char('*') {
                    self.with_assign(Token::Exponent, Token::ExponentAssign)
                } else {
                    self.with_assign(Token::Star, Token::StarAssign)
                }
            }
            '%' => self.with_assign(Token::Percent, Token::PercentAssign),
            '&' => {
                if self.eat_char('&') {
                    self.with_assign(Token::LogicalAnd, Token::LogicalAndAssign)
                } else {
                    self.with_assign(Token::Ampersand, Token::AmpersandAssign)
                }
            }
            '|' => {
                if self.eat_char('|') {
                    self.with_assign(Token::LogicalOr, Token::LogicalOrAssign)
                } else {
                    self.with_assign(Token::Pipe, Token::PipeAssign)
                }
            }
            '^' => self.with_assign(Token::Caret, Token::CaretAssign),
            '/' => self.with_assign(Token::Slash, Token::SlashAssign),
            other => {
                return Err(LexError {
                    message: format!("Unexpected character '{other}'"),
                    position: self.token_position,
                });
            }
        })
    }

    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            if tok == Token::Eof {
                tokens.push(tok);
                return Ok(tokens);
            }
            tokens.push(tok);
        }
    }
}

fn hex_val(ch: char) -> Option<u32> {
    ch.to_digit(16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize_all().unwrap()
    }

    fn lex_no_lt(src: &str) -> Vec<Token> {
        lex(src)
            .into_iter()
            .filter(|t| *t != Token::LineTerminator)
            .collect()
    }

    fn lex_err(src: &str) -> String {
        Lexer::new(src).tokenize_all().unwrap_err().message
    }

    #[test]
    fn empty_source() {
        assert_eq!(lex(""), vec![Token::Eof]);
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            lex("var foo = this"),
            vec![
                Token::Keyword(Keyword::Var),
                Token::Identifier("foo".into()),
                Token::Assign,
                Token::Keyword(Keyword::This),
                Token::Eof
            ]
        );
        assert_eq!(lex("$_x ünï")[..2], [Token::Identifier("$_x".into()), Token::Identifier("ünï".into())]);
        assert_eq!(lex("\\u0061b")[0], Token::Identifier("ab".into()));
        assert_eq!(lex("async of")[..2], [Token::Identifier("async".into()), Token::Identifier("of".into())]);
    }

    #[test]
    fn string_literals() {
        assert_eq!(lex(r#"'a\nb' "\x41\u{1F600}" '\101'"#)[..3], [
            Token::StringLiteral("a\nb".into()),
            Token::StringLiteral("A\u{1F600}".into()),
            Token::StringLiteral("A".into()),
        ]);
        assert_eq!(lex(r#""😀""#)[0], Token::StringLiteral("\u{1F600}".into()));
        assert_eq!(lex_err("'open"), "Unterminated string constant");
    }

    #[test]
    fn numeric_literals() {
        let nums: Vec<Token> = lex("1 2.5 .5 1e3 0x1F 0o17 0b101 017 019 1_000")
            .into_iter()
            .filter(|t| *t != Token::Eof)
            .collect();
        let expected = [1.0, 2.5, 0.5, 1000.0, 31.0, 15.0, 5.0, 15.0, 19.0, 1000.0]
            .map(Token::NumericLiteral);
        assert_eq!(nums, expected);
        assert_eq!(lex_err("10n"), "BigInt literals are not supported");
        assert_eq!(lex_err("3in x"), "Identifier directly after number");
    }

    #[test]
    fn numeric_separators() {
        let nums: Vec<Token> = lex("1_000_000 1_0.2_5 1e1_0 0x1_F 0b1_0 0o1_7")
            .into_iter()
            .filter(|t| *t != Token::Eof)
            .collect();
        let expected = [1e6, 10.25, 1e10, 31.0, 2.0, 15.0].map(Token::NumericLiteral);
        assert_eq!(nums, expected);
        assert_eq!(lex_err("1__0"), "Identifier directly after number");
        assert_eq!(lex_err("1_"), "Identifier directly after number");
        assert_eq!(lex_err("0x1__2"), "Identifier directly after number");
        assert_eq!(lex_err("0x_1"), "Expected number in radix 16");
    }

    #[test]
    fn punctuators_take_longest_match() {
        assert_eq!(
            lex(">>>= ?. ?? ??= ** => ... a?.5"),
            vec![
                Token::UnsignedRightShiftAssign,
                Token::OptionalChain,
                Token::NullishCoalescing,
                Token::NullishAssign,
                Token::Exponent,
                Token::Arrow,
                Token::Ellipsis,
                Token::Identifier("a".into()),
                Token::Question,
                Token::NumericLiteral(0.5),
                Token::Eof
            ]
        );
    }

    #[test]
    fn comments_report_line_breaks() {
        assert_eq!(
            lex("a /* x */ b /* \n */ c // d\ne"),
            vec![
                Token::Identifier("a".into()),
                Token::Identifier("b".into()),
                Token::LineTerminator,
                Token::Identifier("c".into()),
                Token::LineTerminator,
                Token::Identifier("e".into()),
                Token::Eof
            ]
        );
        assert_eq!(lex_no_lt("#!/usr/bin/env node\nx"), vec![Token::Identifier("x".into()), Token::Eof]);
    }

    #[test]
    fn templates_keep_raw_and_cooked() {
        assert_eq!(
            lex("`a\\n${")[0],
            Token::TemplateHead(Some("a\n".into()), "a\\n".into())
        );
        assert_eq!(
            lex("`\\unicode`")[0],
            Token::NoSubstitutionTemplate(None, "\\unicode".into())
        );
    }

    #[test]
    fn regex_bodies() {
        let mut lexer = Lexer::new("a[/]b/gi");
        assert_eq!(
            lexer.lex_regex("").unwrap(),
            Token::RegExpLiteral {
                pattern: "a[/]b".into(),
                flags: "gi".into()
            }
        );
        let mut lexer = Lexer::new("x/gg");
        assert_eq!(lexer.lex_regex("").unwrap_err().message, "Invalid regular expression flag");
    }

    #[test]
    fn positions_track_lines() {
        let mut lexer = Lexer::new("a\n  bc");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("bc".into()));
        assert_eq!(lexer.token_position(), Position { line: 2, column: 2 });
        assert_eq!((lexer.token_start(), lexer.offset()), (4, 6));
    }
}
