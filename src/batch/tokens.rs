//! nom recognizers used by the batch parser.

use nom::{
    bytes::complete::{tag, tag_no_case, take_till, take_until, take_while},
    character::complete::{char, digit1, space0, space1},
    combinator::{eof, map_res, opt, recognize, rest},
    sequence::{delimited, preceded},
    IResult,
};

/// A separator on a line of its own: `GO`, `go 5`, `/`, with optional
/// trailing `--` comment. Returns the repeat count when one is allowed.
pub fn separator_line<'a>(
    input: &'a str,
    token: &str,
    with_count: bool,
) -> IResult<&'a str, Option<u32>> {
    let (input, _) = space0(input)?;
    let (input, _) = tag_no_case(token)(input)?;
    let (input, count) = if with_count {
        opt(preceded(space1, map_res(digit1, |n: &str| n.parse::<u32>())))(input)?
    } else {
        (input, None)
    };
    let (input, _) = space0(input)?;
    let (input, _) = opt(preceded(tag("--"), rest))(input)?;
    let (input, _) = eof(input)?;
    Ok((input, count))
}

/// `--` to end of line.
pub fn line_comment(input: &str) -> IResult<&str, &str> {
    preceded(tag("--"), rest)(input)
}

/// Opening `/*`.
pub fn block_comment_open(input: &str) -> IResult<&str, &str> {
    tag("/*")(input)
}

/// Text up to and including `*/`, or `None` when the comment runs past this line.
pub fn block_comment_tail(input: &str) -> (&str, bool) {
    match take_until::<_, _, nom::error::Error<&str>>("*/")(input) {
        Ok((remaining, _)) => (&remaining[2..], true),
        Err(_) => ("", false),
    }
}

/// A PostgreSQL dollar-quote tag such as `$$` or `$body$`.
pub fn dollar_tag(input: &str) -> IResult<&str, &str> {
    let (remaining, tag) = recognize(delimited(
        char('$'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        char('$'),
    ))(input)?;
    if tag[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    Ok((remaining, tag))
}

/// Consume a quoted run up to its closing character, treating a doubled
/// closing character as an escape. Returns the remaining input, the consumed
/// text, and whether the run was closed on this line.
pub fn quoted_tail(input: &str, close: char) -> (&str, &str, bool) {
    let mut offset = 0;
    loop {
        let (after, _) = take_till::<_, _, nom::error::Error<&str>>(|c| c == close)(&input[offset..])
            .unwrap_or(("", ""));
        if after.is_empty() {
            return ("", input, false);
        }
        offset = input.len() - after.len() + close.len_utf8();
        if input[offset..].starts_with(close) {
            offset += close.len_utf8();
            continue;
        }
        return (&input[offset..], &input[..offset], true);
    }
}

/// Case-insensitive keyword prefix followed by a word boundary.
pub fn keyword<'a>(input: &'a str, word: &str) -> IResult<&'a str, &'a str> {
    let (remaining, matched) = tag_no_case(word)(input)?;
    if remaining.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    Ok((remaining, matched))
}
