/// Which neighbour of the current registration number to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Steps the trailing number of a registration number by one.
///
/// The trailing run of ASCII digits is incremented or decremented (never below
/// zero) and zero-padded back to its original width. The width grows when the
/// value no longer fits, so `"099"` becomes `"100"` and `"999"` becomes `"1000"`.
/// Everything before the run is kept as is.
///
/// Stepping back does not undo a width growth: `"999"` goes to `"1000"`, whose
/// previous value is `"0999"`.
///
/// Returns `None` when the registration number does not end in a digit or the
/// run is too long to be a number.
///
/// ```
/// use beup_result_core::{step_registration_number, Direction};
///
/// assert_eq!(step_registration_number("22CS007", Direction::Next).as_deref(), Some("22CS008"));
/// assert_eq!(step_registration_number("22CS000", Direction::Prev).as_deref(), Some("22CS000"));
/// assert_eq!(step_registration_number("22CS", Direction::Next), None);
/// ```
pub fn step_registration_number(registration_number: &str, direction: Direction) -> Option<String> {
    let digits_start = registration_number
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let (prefix, digits) = registration_number.split_at(digits_start);
    let value: u128 = digits.parse().ok()?;

    let stepped = match direction {
        Direction::Next => value.checked_add(1)?,
        Direction::Prev => value.saturating_sub(1),
    };

    Some(format!("{prefix}{stepped:0width$}", width = digits.len()))
}
