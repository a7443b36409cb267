//! The Scanner
//!
//! The scanner turns script text into [`Word`]s, one at a time, tracking the line and
//! column of each.  It is stateless beyond its position in the input, and it never
//! substitutes anything: variable references, nested scripts, quoted strings, and braced
//! blocks come back as single words carrying their raw text, and the
//! [`builder`](../builder/index.html) decides what to do with them.
//!
//! All modes share one byte-reading core and differ in what ends a literal run:
//!
//! * [`Scanner::scan`] (command mode): `;`, newline, blanks, `#` at the start of a command,
//!   `[`, `{`, `"`, and `$` are significant.
//! * [`Scanner::tokenize`] (expression mode): additionally recognizes numeric literals
//!   (decimal, `0x`, `0o`, `0b`, reals) and the operator set, with maximal munch.
//! * [`Scanner::split`] (quoted-string mode): whitespace is literal; only `$` and `[` are
//!   significant, so literal runs interleave with substitutions.
//! * [`Scanner::split_list`] (list mode): whitespace of any kind separates elements; braces
//!   and quotes group only at the start of an element; `;` and `#` are ordinary.
//!
//! Braced blocks and bracketed scripts are matched by counting nested delimiters of the
//! same type; a backslash hides the character after it from the count.  An unterminated
//! quote, brace, or bracket produces an [`WordKind::Illegal`] word.
//!
//! Inside literal runs, a backslash followed by one of `a b f n r t v` produces the matching
//! control character, and one of `$ \ " [ ] { } ;` or a space produces that character.  Any
//! other backslash sequence is passed through unchanged.  A backslash-newline, together
//! with the blanks that follow it, is a single blank.

use alloc::string::String;
use core::ops::Range;

/// The lexical class of a [`Word`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Eof,
    /// A command separator: newline or `;`.
    Eol,
    Blank,
    Literal,
    Integer,
    Float,
    /// `$name`, `${name}`, or `$name(index)`; the text is the name (with any index).
    Variable,
    /// `[...]`; the text is the raw script between the brackets.
    Script,
    /// `"..."`; the text is the raw content between the quotes.
    Quote,
    /// `{...}`; the text is the raw content between the braces.
    Block,
    Comment,
    LeftParen,
    RightParen,
    Comma,
    Plus,
    Minus,
    Star,
    Power,
    Slash,
    Percent,
    Assign,
    Equal,
    Bang,
    NotEqual,
    Tilde,
    BitAnd,
    And,
    BitOr,
    Or,
    Caret,
    Less,
    LessEqual,
    ShiftLeft,
    Greater,
    GreaterEqual,
    ShiftRight,
    Question,
    Colon,
    DoubleColon,
    /// Unterminated or unrecognized input; the text describes the problem.
    Illegal,
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub kind: WordKind,
    pub text: String,
    /// 1-based line of the word's first character.
    pub line: usize,
    /// 1-based column of the word's first character.
    pub column: usize,
    /// Byte range of the whole word, delimiters included, in the scanned text.
    pub span: Range<usize>,
}

impl Word {
    /// True for the words that end a command.
    pub fn ends_command(&self) -> bool {
        matches!(self.kind, WordKind::Eol | WordKind::Eof)
    }
}

#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    column: usize,
}

/// A cursor over script text that yields [`Word`]s on demand.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    command_start: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            command_start: true,
        }
    }

    /// The text being scanned.
    pub fn source(&self) -> &'a str {
        self.src
    }

    /// The current line number.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    //--------------------------------------------------------------------------------------
    // Modes

    /// Returns the next word in command mode.
    pub fn scan(&mut self) -> Word {
        let start = self.mark();
        let Some(c) = self.peek() else {
            return self.finish(WordKind::Eof, String::new(), start);
        };

        let word = match c {
            b'\n' | b';' => {
                self.bump();
                self.command_start = true;
                return self.finish(WordKind::Eol, String::from(c as char), start);
            }
            b' ' | b'\t' | b'\r' => return self.blank(start, false),
            b'\\' if self.peek_at(1) == Some(b'\n') => return self.blank(start, false),
            b'#' if self.command_start => self.comment(start),
            b'{' => self.block(start),
            b'[' => self.script(start),
            b'"' => self.quote(start),
            b'$' => self.variable(start),
            _ => self.literal(start, |c| {
                matches!(
                    c,
                    b' ' | b'\t' | b'\r' | b'\n' | b';' | b'[' | b'{' | b'"' | b'$'
                )
            }),
        };

        self.command_start = false;
        word
    }

    /// Returns the next word in expression mode.  Whitespace is skipped.
    pub fn tokenize(&mut self) -> Word {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.bump();
        }

        let start = self.mark();
        let Some(c) = self.peek() else {
            return self.finish(WordKind::Eof, String::new(), start);
        };

        match c {
            b'0'..=b'9' => self.number(start),
            b'.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number(start),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
                    self.bump();
                }
                let text = String::from(&self.src[start.pos..self.pos]);
                self.finish(WordKind::Literal, text, start)
            }
            b'$' => self.variable(start),
            b'[' => self.script(start),
            b'"' => self.quote(start),
            b'{' => self.block(start),
            _ => self.operator(start, c),
        }
    }

    /// Returns the next word of a quoted string's content: literal runs (whitespace
    /// included), variable references, and nested scripts.
    pub fn split(&mut self) -> Word {
        let start = self.mark();
        match self.peek() {
            None => self.finish(WordKind::Eof, String::new(), start),
            Some(b'$') => self.variable(start),
            Some(b'[') => self.script(start),
            Some(_) => self.literal(start, |c| matches!(c, b'$' | b'[')),
        }
    }

    /// Returns the next word in list mode.
    pub fn split_list(&mut self) -> Word {
        let start = self.mark();
        let at_element_start = self.pos == 0
            || matches!(
                self.src.as_bytes()[self.pos - 1],
                b' ' | b'\t' | b'\r' | b'\n'
            );

        match self.peek() {
            None => self.finish(WordKind::Eof, String::new(), start),
            Some(b' ' | b'\t' | b'\r' | b'\n') => self.blank(start, true),
            Some(b'\\') if self.peek_at(1) == Some(b'\n') => self.blank(start, true),
            Some(b'{') if at_element_start => self.block(start),
            Some(b'"') if at_element_start => self.quote(start),
            Some(b'[') => self.script(start),
            Some(b'$') => self.variable(start),
            Some(_) => self.literal(start, |c| {
                matches!(c, b' ' | b'\t' | b'\r' | b'\n' | b'[' | b'$')
            }),
        }
    }

    //--------------------------------------------------------------------------------------
    // Word scanners

    fn blank(&mut self, start: Mark, newlines: bool) -> Word {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.bump();
                }
                Some(b'\n') if newlines => {
                    self.bump();
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
        let text = String::from(&self.src[start.pos..self.pos]);
        self.finish(WordKind::Blank, text, start)
    }

    fn comment(&mut self, start: Mark) -> Word {
        self.bump();
        let body = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b'\n' => break,
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }
        let text = String::from(&self.src[body..self.pos]);
        self.finish(WordKind::Comment, text, start)
    }

    fn block(&mut self, start: Mark) -> Word {
        match self.matched(b'{', b'}') {
            Some(inner) => {
                let text = String::from(&self.src[inner]);
                self.finish(WordKind::Block, text, start)
            }
            None => self.illegal(start, "missing close-brace"),
        }
    }

    fn script(&mut self, start: Mark) -> Word {
        match self.matched(b'[', b']') {
            Some(inner) => {
                let text = String::from(&self.src[inner]);
                self.finish(WordKind::Script, text, start)
            }
            None => self.illegal(start, "missing close-bracket"),
        }
    }

    fn quote(&mut self, start: Mark) -> Word {
        self.bump();
        let inner = self.pos;
        loop {
            match self.peek() {
                None => return self.illegal(start, "missing \""),
                Some(b'"') => break,
                Some(b'\\') => {
                    self.bump();
                    self.bump();
                }
                Some(b'[') => {
                    if self.matched(b'[', b']').is_none() {
                        return self.illegal(start, "missing close-bracket");
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let text = String::from(&self.src[inner..self.pos]);
        self.bump();
        self.finish(WordKind::Quote, text, start)
    }

    /// Scans `$name`, `${name}`, `$ns::name`, or `$name(index)`.  A `$` that isn't followed
    /// by a name is a literal dollar sign.
    fn variable(&mut self, start: Mark) -> Word {
        self.bump();

        if self.peek() == Some(b'{') {
            self.bump();
            let name = self.pos;
            while self.peek().is_some_and(|c| c != b'}') {
                self.bump();
            }
            if self.at_end() {
                return self.illegal(start, "missing close-brace for variable name");
            }
            let text = String::from(&self.src[name..self.pos]);
            self.bump();
            return self.finish(WordKind::Variable, text, start);
        }

        let name = self.pos;
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == b'_' => {
                    self.bump();
                }
                Some(b':') if self.peek_at(1) == Some(b':') => {
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }

        if self.pos == name {
            return self.finish(WordKind::Literal, String::from("$"), start);
        }

        if self.peek() == Some(b'(') {
            if self.matched(b'(', b')').is_none() {
                return self.illegal(start, "missing )");
            }
        }

        let text = String::from(&self.src[name..self.pos]);
        self.finish(WordKind::Variable, text, start)
    }

    /// Scans a literal run up to (not including) the first byte for which `stop` is true,
    /// processing backslash escapes.
    fn literal(&mut self, start: Mark, stop: impl Fn(u8) -> bool) -> Word {
        let mut text = String::new();
        let mut run = self.pos;

        while let Some(c) = self.peek() {
            if c == b'\\' {
                text.push_str(&self.src[run..self.pos]);
                if self.peek_at(1) == Some(b'\n') {
                    if stop(b' ') {
                        run = self.pos;
                        break;
                    }
                    // Inside quotes a continuation collapses to one space.
                    self.bump();
                    self.bump();
                    while matches!(self.peek(), Some(b' ' | b'\t')) {
                        self.bump();
                    }
                    text.push(' ');
                    run = self.pos;
                    continue;
                }

                self.bump();
                match self.peek().and_then(escape) {
                    Some(ch) => {
                        self.bump();
                        text.push(ch);
                    }
                    None => text.push('\\'),
                }
                run = self.pos;
            } else if stop(c) {
                break;
            } else {
                self.bump();
            }
        }

        text.push_str(&self.src[run..self.pos]);
        self.finish(WordKind::Literal, text, start)
    }

    fn number(&mut self, start: Mark) -> Word {
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some(b'0'), Some(b'x' | b'X')) => 16,
            (Some(b'0'), Some(b'o' | b'O')) => 8,
            (Some(b'0'), Some(b'b' | b'B')) => 2,
            _ => 10,
        };

        let mut kind = WordKind::Integer;
        if radix != 10 {
            self.bump();
            self.bump();
            let digits = self.pos;
            while self.peek().is_some_and(|c| (c as char).is_digit(radix)) {
                self.bump();
            }
            if self.pos == digits {
                return self.malformed(start);
            }
        } else {
            self.digits();
            if self.peek() == Some(b'.') {
                kind = WordKind::Float;
                self.bump();
                self.digits();
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
                if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                    kind = WordKind::Float;
                    for _ in 0..=sign {
                        self.bump();
                    }
                    self.digits();
                }
            }
        }

        if self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.') {
            return self.malformed(start);
        }

        let text = String::from(&self.src[start.pos..self.pos]);
        self.finish(kind, text, start)
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn malformed(&mut self, start: Mark) -> Word {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.') {
            self.bump();
        }
        let text = alloc::format!("malformed number \"{}\"", &self.src[start.pos..self.pos]);
        self.finish(WordKind::Illegal, text, start)
    }

    fn operator(&mut self, start: Mark, c: u8) -> Word {
        let next = self.peek_at(1);
        let (kind, len) = match (c, next) {
            (b'(', _) => (WordKind::LeftParen, 1),
            (b')', _) => (WordKind::RightParen, 1),
            (b',', _) => (WordKind::Comma, 1),
            (b'+', _) => (WordKind::Plus, 1),
            (b'-', _) => (WordKind::Minus, 1),
            (b'*', Some(b'*')) => (WordKind::Power, 2),
            (b'*', _) => (WordKind::Star, 1),
            (b'/', _) => (WordKind::Slash, 1),
            (b'%', _) => (WordKind::Percent, 1),
            (b'=', Some(b'=')) => (WordKind::Equal, 2),
            (b'=', _) => (WordKind::Assign, 1),
            (b'!', Some(b'=')) => (WordKind::NotEqual, 2),
            (b'!', _) => (WordKind::Bang, 1),
            (b'~', _) => (WordKind::Tilde, 1),
            (b'&', Some(b'&')) => (WordKind::And, 2),
            (b'&', _) => (WordKind::BitAnd, 1),
            (b'|', Some(b'|')) => (WordKind::Or, 2),
            (b'|', _) => (WordKind::BitOr, 1),
            (b'^', _) => (WordKind::Caret, 1),
            (b'<', Some(b'=')) => (WordKind::LessEqual, 2),
            (b'<', Some(b'<')) => (WordKind::ShiftLeft, 2),
            (b'<', _) => (WordKind::Less, 1),
            (b'>', Some(b'=')) => (WordKind::GreaterEqual, 2),
            (b'>', Some(b'>')) => (WordKind::ShiftRight, 2),
            (b'>', _) => (WordKind::Greater, 1),
            (b'?', _) => (WordKind::Question, 1),
            (b':', Some(b':')) => (WordKind::DoubleColon, 2),
            (b':', _) => (WordKind::Colon, 1),
            _ => {
                self.bump_char();
                let text = alloc::format!(
                    "unexpected character \"{}\"",
                    &self.src[start.pos..self.pos]
                );
                return self.finish(WordKind::Illegal, text, start);
            }
        };

        for _ in 0..len {
            self.bump();
        }
        let text = String::from(&self.src[start.pos..self.pos]);
        self.finish(kind, text, start)
    }

    //--------------------------------------------------------------------------------------
    // Cursor primitives

    /// Consumes a delimited region starting at the open delimiter, counting nested
    /// delimiters of the same type.  Returns the inner byte range, or `None` (having
    /// consumed the rest of the input) if the region is unterminated.
    fn matched(&mut self, open: u8, close: u8) -> Option<Range<usize>> {
        self.bump();
        let inner = self.pos;
        let mut depth = 1;

        while let Some(c) = self.bump() {
            if c == b'\\' {
                self.bump();
            } else if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some(inner..self.pos - 1);
                }
            }
        }

        None
    }

    fn illegal(&mut self, start: Mark, msg: &str) -> Word {
        self.pos = self.src.len();
        self.finish(WordKind::Illegal, String::from(msg), start)
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn finish(&self, kind: WordKind, text: String, start: Mark) -> Word {
        Word {
            kind,
            text,
            line: start.line,
            column: start.column,
            span: start.pos..self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if c & 0xC0 != 0x80 {
            // Continuation bytes of a UTF-8 sequence don't start a new column.
            self.column += 1;
        }
        Some(c)
    }

    fn bump_char(&mut self) {
        self.bump();
        while self.peek().is_some_and(|c| c & 0xC0 == 0x80) {
            self.bump();
        }
    }
}

/// Maps the character after a backslash to its replacement, if it's a recognized escape.
fn escape(c: u8) -> Option<char> {
    match c {
        b'a' => Some('\x07'),
        b'b' => Some('\x08'),
        b'f' => Some('\x0c'),
        b'n' => Some('\n'),
        b'r' => Some('\r'),
        b't' => Some('\t'),
        b'v' => Some('\x0b'),
        b'$' | b' ' | b'\\' | b'"' | b'[' | b']' | b'{' | b'}' | b';' => Some(c as char),
        _ => None,
    }
}

/// Processes the backslash escapes in `text`, with no other substitution.  Used for quoted
/// list elements.
pub(crate) fn unescape(text: &str) -> String {
    let mut scanner = Scanner::new(text);
    let start = scanner.mark();
    scanner.literal(start, |_| false).text
}
