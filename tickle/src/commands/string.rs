//! The `string` ensemble.

use super::parse_index;
use crate::interp::Interp;
use crate::types::*;
use crate::{check_args, tickle_opt_ok};
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

/// # string *subcommand* ?*arg* ...?
pub fn cmd_string<Ctx>(interp: &mut Interp<Ctx>, argv: &[Value], ctx: &mut Ctx) -> TickleOptResult {
    interp.call_subcommand(
        argv,
        1,
        &[
            Subcommand("compare", cmd_string_compare),
            Subcommand("equal", cmd_string_equal),
            Subcommand("first", cmd_string_first),
            Subcommand("index", cmd_string_index),
            Subcommand("length", cmd_string_length),
            Subcommand("range", cmd_string_range),
            Subcommand("repeat", cmd_string_repeat),
            Subcommand("tolower", cmd_string_tolower),
            Subcommand("toupper", cmd_string_toupper),
            Subcommand("trim", cmd_string_trim),
            Subcommand("trimleft", cmd_string_trimleft),
            Subcommand("trimright", cmd_string_trimright),
        ],
        ctx,
    )
}

/// Splits off a leading `-nocase` option and checks that two strings remain.
fn two_strings<'a>(argv: &'a [Value], argsig: &str) -> Result<(bool, &'a [Value]), Exception> {
    check_args(2, argv, 4, 5, argsig)?;
    match argv.len() {
        5 if argv[2].as_str() == "-nocase" => Ok((true, &argv[3..])),
        5 => Err(super::wrong_args(argv, 2, argsig)),
        _ => Ok((false, &argv[2..])),
    }
}

fn compare_strings(a: &Value, b: &Value, nocase: bool) -> Ordering {
    if nocase {
        a.as_str().to_lowercase().cmp(&b.as_str().to_lowercase())
    } else {
        a.as_str().cmp(&b.as_str())
    }
}

/// # string compare ?-nocase? *string1* *string2*
pub fn cmd_string_compare<Ctx>(
    _: &mut Interp<Ctx>,
    argv: &[Value],
    _: &mut Ctx,
) -> TickleOptResult {
    let (nocase, strings) = two_strings(argv, "?-nocase? string1 string2")?;

    let order: TickleInt = match compare_strings(&strings[0], &strings[1], nocase) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    tickle_opt_ok!(order)
}

/// # string equal ?-nocase? *string1* *string2*
pub fn cmd_string_equal<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    let (nocase, strings) = two_strings(argv, "?-nocase? string1 string2")?;
    let equal = compare_strings(&strings[0], &strings[1], nocase) == Ordering::Equal;
    tickle_opt_ok!(equal)
}

/// # string first *needleString* *haystackString* ?*startIndex*?
///
/// Returns the character index of the first occurrence of the needle at or after the
/// start index, or -1.
pub fn cmd_string_first<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 4, 5, "needleString haystackString ?startIndex?")?;

    let needle = argv[2].as_str();
    let haystack: Vec<char> = argv[3].as_str().chars().collect();
    let start = match argv.get(4) {
        Some(index) => parse_index(index, haystack.len())?.max(0) as usize,
        None => 0,
    };

    if start > haystack.len() {
        return tickle_opt_ok!(-1);
    }

    let rest: String = haystack[start..].iter().collect();
    let found: TickleInt = match rest.find(&*needle) {
        Some(byte_pos) => (start + rest[..byte_pos].chars().count()) as TickleInt,
        None => -1,
    };
    tickle_opt_ok!(found)
}

/// # string index *string* *charIndex*
pub fn cmd_string_index<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 4, 4, "string charIndex")?;

    let text = argv[2].as_str();
    let len = text.chars().count();
    let index = parse_index(&argv[3], len)?;

    match usize::try_from(index).ok().and_then(|i| text.chars().nth(i)) {
        Some(c) => tickle_opt_ok!(String::from(c)),
        None => tickle_opt_ok!(),
    }
}

/// # string length *string*
pub fn cmd_string_length<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 3, 3, "string")?;
    tickle_opt_ok!(argv[2].as_str().chars().count())
}

/// # string range *string* *first* *last*
pub fn cmd_string_range<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 5, 5, "string first last")?;

    let text = argv[2].as_str();
    let len = text.chars().count();
    let first = parse_index(&argv[3], len)?.max(0);
    let last = parse_index(&argv[4], len)?.min(len as TickleInt - 1);

    if first > last {
        return tickle_opt_ok!();
    }

    let range: String = text
        .chars()
        .skip(first as usize)
        .take((last - first + 1) as usize)
        .collect();
    tickle_opt_ok!(range)
}

/// # string repeat *string* *count*
pub fn cmd_string_repeat<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 4, 4, "string count")?;
    let count = argv[3].to_int()?.max(0) as usize;
    tickle_opt_ok!(argv[2].as_str().repeat(count))
}

/// # string tolower *string*
pub fn cmd_string_tolower<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 3, 3, "string")?;
    tickle_opt_ok!(argv[2].as_str().to_lowercase())
}

/// # string toupper *string*
pub fn cmd_string_toupper<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    check_args(2, argv, 3, 3, "string")?;
    tickle_opt_ok!(argv[2].as_str().to_uppercase())
}

#[derive(Clone, Copy)]
enum Trim {
    Both,
    Left,
    Right,
}

fn trim(argv: &[Value], side: Trim) -> TickleOptResult {
    check_args(2, argv, 3, 4, "string ?chars?")?;

    let text = argv[2].as_str();
    let trimmed = match argv.get(3) {
        Some(chars) => {
            let chars: Vec<char> = chars.as_str().chars().collect();
            let set = |c: char| chars.contains(&c);
            match side {
                Trim::Both => text.trim_matches(set),
                Trim::Left => text.trim_start_matches(set),
                Trim::Right => text.trim_end_matches(set),
            }
            .to_owned()
        }
        None => match side {
            Trim::Both => text.trim(),
            Trim::Left => text.trim_start(),
            Trim::Right => text.trim_end(),
        }
        .to_owned(),
    };

    tickle_opt_ok!(trimmed)
}

/// # string trim *string* ?*chars*?
pub fn cmd_string_trim<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    trim(argv, Trim::Both)
}

/// # string trimleft *string* ?*chars*?
pub fn cmd_string_trimleft<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    trim(argv, Trim::Left)
}

/// # string trimright *string* ?*chars*?
pub fn cmd_string_trimright<Ctx>(_: &mut Interp<Ctx>, argv: &[Value], _: &mut Ctx) -> TickleOptResult {
    trim(argv, Trim::Right)
}
