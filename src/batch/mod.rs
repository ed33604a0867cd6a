//! Splitting raw SQL scripts into executable statements.
//!
//! The parser is fed one line at a time and keeps its lexical state between
//! lines, so a string literal or block comment may span lines and no input
//! needs to be held twice. Boundaries come from a statement terminator
//! (`;`), a separator on a line of its own (`GO`, `/`), or both. Separator
//! text inside literals, quoted identifiers and comments never splits.

pub mod tokens;

use std::io::BufRead;

use crate::error::Result;

/// Output of the parser, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// One executable statement, comments removed, terminator excluded.
    Statement(String),
    /// A boundary token was seen. `count` is the repeat count of `GO n`.
    SpecialToken { token: String, count: u32 },
}

/// Per-dialect boundary rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRules {
    terminator: Option<char>,
    separator: Option<&'static str>,
    separator_count: bool,
    dollar_quotes: bool,
    brackets: bool,
    backticks: bool,
    block_starters: &'static [&'static str],
}

impl BatchRules {
    /// Statements end at `;`.
    pub fn terminated() -> Self {
        Self {
            terminator: Some(';'),
            separator: None,
            separator_count: false,
            dollar_quotes: false,
            brackets: false,
            backticks: false,
            block_starters: &[],
        }
    }

    /// Batches end at a separator line (`GO [n]`); `;` does not split.
    pub fn separator_line(token: &'static str) -> Self {
        Self {
            terminator: None,
            separator: Some(token),
            separator_count: true,
            ..Self::terminated()
        }
    }

    /// Also end statements at a separator line, without a repeat count.
    pub fn with_separator(mut self, token: &'static str) -> Self {
        self.separator = Some(token);
        self.separator_count = false;
        self
    }

    pub fn with_dollar_quotes(mut self) -> Self {
        self.dollar_quotes = true;
        self
    }

    pub fn with_brackets(mut self) -> Self {
        self.brackets = true;
        self
    }

    pub fn with_backticks(mut self) -> Self {
        self.backticks = true;
        self
    }

    /// Statements starting with one of these keywords are procedural blocks:
    /// `;` stays inside them and only the separator line ends them.
    pub fn with_block_starters(mut self, starters: &'static [&'static str]) -> Self {
        self.block_starters = starters;
        self
    }

    pub fn terminator(&self) -> Option<char> {
        self.terminator
    }

    /// Whether `statement` opens a procedural block.
    pub fn starts_block(&self, statement: &str) -> bool {
        let statement = statement.trim_start();
        self.block_starters
            .iter()
            .any(|starter| tokens::keyword(statement, starter).is_ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LexState {
    Normal,
    BlockComment,
    Quoted(char),
    Dollar(String),
}

/// Incremental, line-oriented statement splitter.
#[derive(Debug)]
pub struct BatchParser {
    rules: BatchRules,
    state: LexState,
    buffer: String,
    in_block: bool,
    events: Vec<BatchEvent>,
}

impl BatchParser {
    pub fn new(rules: BatchRules) -> Self {
        Self {
            rules,
            state: LexState::Normal,
            buffer: String::new(),
            in_block: false,
            events: Vec::new(),
        }
    }

    /// Split a complete script.
    pub fn split(rules: BatchRules, text: &str) -> Vec<BatchEvent> {
        let mut parser = BatchParser::new(rules);
        for line in text.lines() {
            parser.feed_line(line);
        }
        parser.finish();
        parser.take_events()
    }

    /// Stream a script from a reader, handing each event to `sink` as soon
    /// as it is complete.
    pub fn process<R, F>(rules: BatchRules, reader: R, mut sink: F) -> Result<()>
    where
        R: BufRead,
        F: FnMut(BatchEvent) -> Result<()>,
    {
        let mut parser = BatchParser::new(rules);
        for line in reader.lines() {
            parser.feed_line(&line?);
            for event in parser.take_events() {
                sink(event)?;
            }
        }
        parser.finish();
        for event in parser.take_events() {
            sink(event)?;
        }
        Ok(())
    }

    /// True when the text holds more than one statement, a repeated batch, or
    /// a separator line that must be stripped before execution.
    pub fn is_multi_statement(rules: &BatchRules, text: &str) -> bool {
        Self::is_multi_batch(rules, &BatchParser::split(rules.clone(), text))
    }

    /// [`is_multi_statement`](Self::is_multi_statement) over already split events.
    pub fn is_multi_batch(rules: &BatchRules, events: &[BatchEvent]) -> bool {
        let mut statements = 0;
        for event in events {
            match event {
                BatchEvent::Statement(_) => statements += 1,
                BatchEvent::SpecialToken { count, .. } if *count > 1 => return true,
                BatchEvent::SpecialToken { token, .. } if rules.separator == Some(token.as_str()) => {
                    return true;
                }
                BatchEvent::SpecialToken { .. } => {}
            }
            if statements > 1 {
                return true;
            }
        }
        false
    }

    /// Events produced so far.
    pub fn take_events(&mut self) -> Vec<BatchEvent> {
        std::mem::take(&mut self.events)
    }

    /// Flush whatever statement text remains at end of input.
    pub fn finish(&mut self) {
        self.flush();
        self.state = LexState::Normal;
        self.in_block = false;
    }

    fn flush(&mut self) {
        let statement = self.buffer.trim();
        if !statement.is_empty() {
            self.events.push(BatchEvent::Statement(statement.to_string()));
        }
        self.buffer.clear();
    }

    fn boundary(&mut self, token: &str, count: u32) {
        self.flush();
        self.in_block = false;
        self.events.push(BatchEvent::SpecialToken {
            token: token.to_string(),
            count,
        });
    }

    pub fn feed_line(&mut self, line: &str) {
        if self.state == LexState::Normal {
            if let Some(separator) = self.rules.separator {
                if let Ok((_, count)) =
                    tokens::separator_line(line, separator, self.rules.separator_count)
                {
                    self.boundary(separator, count.unwrap_or(1));
                    return;
                }
            }
        }

        let mut input = line;
        while !input.is_empty() {
            input = match self.state.clone() {
                LexState::BlockComment => {
                    let (remaining, closed) = tokens::block_comment_tail(input);
                    if closed {
                        self.state = LexState::Normal;
                        self.buffer.push(' ');
                    }
                    remaining
                }
                LexState::Quoted(close) => {
                    let (remaining, consumed, closed) = tokens::quoted_tail(input, close);
                    self.buffer.push_str(consumed);
                    if closed {
                        self.state = LexState::Normal;
                    }
                    remaining
                }
                LexState::Dollar(tag) => match input.find(tag.as_str()) {
                    Some(at) => {
                        let end = at + tag.len();
                        self.buffer.push_str(&input[..end]);
                        self.state = LexState::Normal;
                        &input[end..]
                    }
                    None => {
                        self.buffer.push_str(input);
                        ""
                    }
                },
                LexState::Normal => self.scan_normal(input),
            };
        }
        if self.state != LexState::BlockComment && !self.buffer.trim().is_empty() {
            self.buffer.push('\n');
        }
    }

    /// Consume one token of ordinary text and return what is left.
    fn scan_normal<'a>(&mut self, input: &'a str) -> &'a str {
        if tokens::line_comment(input).is_ok() {
            return "";
        }
        if let Ok((remaining, _)) = tokens::block_comment_open(input) {
            self.state = LexState::BlockComment;
            return remaining;
        }
        if self.rules.dollar_quotes {
            if let Ok((remaining, tag)) = tokens::dollar_tag(input) {
                self.buffer.push_str(tag);
                self.state = LexState::Dollar(tag.to_string());
                return remaining;
            }
        }

        let Some(c) = input.chars().next() else {
            return input;
        };
        let remaining = &input[c.len_utf8()..];

        if self.buffer.trim().is_empty() && !c.is_whitespace() && !self.in_block {
            self.in_block = self.rules.starts_block(input);
        }

        let close = match c {
            '\'' | '"' => Some(c),
            '[' if self.rules.brackets => Some(']'),
            '`' if self.rules.backticks => Some('`'),
            _ => None,
        };
        if let Some(close) = close {
            self.buffer.push(c);
            self.state = LexState::Quoted(close);
            return remaining;
        }

        if Some(c) == self.rules.terminator && !self.in_block {
            self.boundary(&c.to_string(), 1);
            return remaining;
        }

        self.buffer.push(c);
        remaining
    }
}
