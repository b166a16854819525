//! Human-readable descriptions of outstanding review requirements.

/// Join items as an English list with an Oxford comma.
///
/// `["a"]` gives `a`, `["a", "b"]` gives `a and b`, and
/// `["a", "b", "c"]` gives `a, b, and c`.
pub fn format_comma_separated_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} and {}", first.as_ref(), second.as_ref()),
        [rest @ .., last] => {
            let rest: Vec<&str> = rest.iter().map(|item| item.as_ref()).collect();
            format!("{}, and {}", rest.join(", "), last.as_ref())
        }
    }
}

/// Describe who still has to review: an anonymous count plus named people.
///
/// Returns `nobody` when there is nothing outstanding.
pub fn format_missing_approvals<S: AsRef<str>>(count: u32, people: &[S]) -> String {
    let mut requirements = Vec::with_capacity(people.len() + 1);

    if count != 0 {
        let noun = if count == 1 { "owner" } else { "owners" };
        requirements.push(format!("at least {} additional code {}", count, noun));
    }

    requirements.extend(people.iter().map(|p| p.as_ref().to_string()));

    if requirements.is_empty() {
        return "nobody".to_string();
    }

    format_comma_separated_list(&requirements)
}
