use crate::models::stat::Trend;

/// `values` is ordered newest first.
pub fn trend(values: &[f64], is_inverted: bool) -> Option<Trend> {
    match values {
        [newest, previous, ..] => Some(compare(*newest, *previous, is_inverted)),
        _ => None,
    }
}

/// Number of consecutive newest-to-oldest steps that moved in the worse
/// direction (down normally, up for inverted stats). Stops at the first step
/// that did not.
pub fn down_streak(values: &[f64], is_inverted: bool) -> u32 {
    values
        .windows(2)
        .take_while(|pair| compare(pair[0], pair[1], is_inverted) == Trend::Down)
        .count() as u32
}

fn compare(newer: f64, older: f64, is_inverted: bool) -> Trend {
    if newer == older {
        return Trend::Flat;
    }
    let improved = if is_inverted {
        newer < older
    } else {
        newer > older
    };
    if improved {
        Trend::Up
    } else {
        Trend::Down
    }
}
