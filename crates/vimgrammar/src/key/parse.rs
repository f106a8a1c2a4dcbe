use std::ops::BitOr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{anychar, char, digit1},
    combinator::{eof, map_res, value},
    multi::{many0, many1},
    IResult,
};

use super::{KeyCode, KeyModifiers, KeyToken};

fn parse_modifier(input: &str) -> IResult<&str, KeyModifiers> {
    /*
     * Parse the modifier prefixes in things like <C-...>, <S-...>, <A-...>, and <M-...>.
     *
     * Terminals can't report Apple's Command key, so Vim's <D-...> isn't accepted.
     */
    alt((
        value(KeyModifiers::ALT, tag("A-")),
        value(KeyModifiers::ALT, tag("M-")),
        value(KeyModifiers::CONTROL, tag("C-")),
        value(KeyModifiers::SHIFT, tag("S-")),
    ))(input)
}

fn parse_arrow(input: &str) -> IResult<&str, KeyCode> {
    alt((
        value(KeyCode::Left, tag("Left")),
        value(KeyCode::Right, tag("Right")),
        value(KeyCode::Up, tag("Up")),
        value(KeyCode::Down, tag("Down")),
    ))(input)
}

fn parse_movement(input: &str) -> IResult<&str, KeyCode> {
    alt((
        value(KeyCode::PageUp, tag("PageUp")),
        value(KeyCode::PageDown, tag("PageDown")),
        value(KeyCode::Home, tag("Home")),
        value(KeyCode::End, tag("End")),
    ))(input)
}

fn parse_editing(input: &str) -> IResult<&str, KeyCode> {
    alt((
        value(KeyCode::Insert, alt((tag("Insert"), tag("Ins")))),
        value(KeyCode::Delete, alt((tag("Delete"), tag("Del")))),
        value(KeyCode::Backspace, alt((tag("BackSpace"), tag("Backspace"), tag("BS")))),
    ))(input)
}

fn parse_virtual(input: &str) -> IResult<&str, KeyCode> {
    alt((
        value(KeyCode::Undo, tag("Undo")),
        value(KeyCode::Help, tag("Help")),
        value(KeyCode::Unknown, tag("Unknown")),
    ))(input)
}

fn parse_named_ascii(input: &str) -> IResult<&str, KeyCode> {
    alt((
        value(KeyCode::Char(' '), tag("Space")),
        value(KeyCode::Char('|'), tag("Bar")),
        value(KeyCode::Char('\\'), tag("Bslash")),
        value(KeyCode::Char('<'), tag("lt")),
    ))(input)
}

fn parse_named_ctl(input: &str) -> IResult<&str, KeyCode> {
    alt((
        value(KeyCode::Esc, tag("Esc")),
        value(KeyCode::Tab, tag("Tab")),
        value(KeyCode::Char('\n'), alt((tag("NewLine"), tag("NL"), tag("LineFeed"), tag("LF")))),
        value(KeyCode::Enter, alt((tag("CR"), tag("Return"), tag("Enter")))),
        value(KeyCode::Null, tag("Nul")),
    ))(input)
}

fn parse_keyname(input: &str) -> IResult<&str, KeyCode> {
    alt((
        parse_arrow,
        parse_named_ascii,
        parse_named_ctl,
        parse_movement,
        parse_editing,
        parse_virtual,
    ))(input)
}

fn parse_function(input: &str) -> IResult<&str, KeyCode> {
    let (input, _) = char('F')(input)?;
    let (input, n) = map_res(digit1, |s: &str| s.parse::<u8>())(input)?;

    Ok((input, KeyCode::F(n)))
}

fn parse_anychar(input: &str) -> IResult<&str, KeyCode> {
    let (input, c) = anychar(input)?;

    Ok((input, KeyCode::Char(c)))
}

fn parse_simple(input: &str) -> IResult<&str, KeyToken> {
    let (input, c) = anychar(input)?;

    Ok((input, KeyToken::from(c)))
}

fn parse_special(input: &str) -> IResult<&str, KeyToken> {
    let (input, _) = char('<')(input)?;
    let (input, m) = many0(parse_modifier)(input)?;
    let (input, k) = alt((parse_keyname, parse_function, parse_anychar))(input)?;
    let (input, _) = char('>')(input)?;

    let m = m.into_iter().fold(KeyModifiers::empty(), BitOr::bitor);

    Ok((input, KeyToken::new(k, m)))
}

pub fn parse_key_str(input: &str) -> IResult<&str, KeyToken> {
    let (input, res) = alt((parse_special, parse_simple))(input)?;
    let (input, _) = eof(input)?;

    Ok((input, res))
}

pub fn parse_macro_str(input: &str) -> IResult<&str, Vec<KeyToken>> {
    let (input, res) = many1(alt((parse_special, parse_simple)))(input)?;
    let (input, _) = eof(input)?;

    Ok((input, res))
}
