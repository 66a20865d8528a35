//! Directive strings attached to emitted signals.
//!
//! A directive names the kind that fired and the attention it implies —
//! enough for the decision pipeline to know why it was woken. Full prompt
//! formatting belongs to the consumer, not here.

use soma_core::Signal;

fn gist(kind: Signal) -> &'static str {
    match kind {
        Signal::Social => "interactions have gone unchecked; review pending items and reply where attention is due",
        Signal::Curiosity => "exploration drive, not urgency; browse what is happening, observation alone can satisfy it",
        Signal::Maintenance => "context or resources likely need housekeeping; review usage and archive or compact",
        Signal::Boredom => "nothing has demanded attention for a while; consider creating something, or rest",
        Signal::Anxiety => "something might be wrong; check for errors, unanswered items and stuck loops",
        Signal::Drift => "recent outputs may be deviating from baseline; review length, style and patterns",
        Signal::Stale => "relied-upon information may have decayed; verify it or acknowledge it is current",
        Signal::Uncanny => "something does not fit expected patterns; name the mismatch and the concrete behavior change",
    }
}

pub fn render(kind: Signal, pressure: f64, forced: bool) -> String {
    let mut directive = format!(
        "{} (pressure {:.2}): {}.",
        kind.as_str().to_uppercase(),
        pressure,
        gist(kind)
    );
    if forced {
        directive.push_str(" Emitted because the maximum interval elapsed.");
    }
    directive
}
