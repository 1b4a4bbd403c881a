// Plain-text run summary and listing of the best options

use std::io::{self, Write};

use crate::aggregate::Aggregation;
use crate::models::DirectionItinerary;

const WIDTH: usize = 50;
const LABEL_WIDTH: usize = 12;
const DATETIME_FORMAT: &str = "%a %b %d %I:%M %p %:z";

pub fn summary_line(aggregated: &Aggregation) -> String {
    if aggregated.all_succeeded() {
        format!("All {} queries returned successfully!", aggregated.successes)
    } else {
        format!(
            "Errors! Only {}/{} queries returned successfully.",
            aggregated.successes, aggregated.attempted
        )
    }
}

/// Writes the summary line followed by at most `top_n` options, in the order
/// they appear in `aggregated.options`.
pub fn render(out: &mut impl Write, aggregated: &Aggregation, top_n: usize) -> io::Result<()> {
    writeln!(out, "{}", summary_line(aggregated))?;

    for option in aggregated.options.iter().take(top_n) {
        writeln!(out, "{}", "=".repeat(WIDTH))?;
        writeln!(out, "{:<LABEL_WIDTH$}${:.2}", "Cost:", option.price)?;

        let labels = ["Outbound:", "Inbound:"];
        for (label, direction) in labels.into_iter().zip(option.directions()) {
            writeln!(out, "{}", "-".repeat(WIDTH))?;
            write!(out, "{:<LABEL_WIDTH$}", label)?;
            render_direction(out, direction)?;
        }
    }

    out.flush()
}

fn render_direction(out: &mut impl Write, direction: &DirectionItinerary) -> io::Result<()> {
    if direction.segments.is_empty() {
        return writeln!(out, "(no segments)");
    }

    for (i, segment) in direction.segments.iter().enumerate() {
        // Routes after the first line up under the direction label
        if i > 0 {
            write!(out, "{}", " ".repeat(LABEL_WIDTH))?;
        }
        writeln!(out, "{} -> {}", segment.origin, segment.destination)?;
        writeln!(
            out,
            "{:<LABEL_WIDTH$}{} ({})",
            "Flight:", segment.flight_number, segment.carrier
        )?;
        writeln!(
            out,
            "{:<LABEL_WIDTH$}{}",
            "Departure:",
            segment.departure.format(DATETIME_FORMAT)
        )?;
        writeln!(
            out,
            "{:<LABEL_WIDTH$}{}",
            "Arrival:",
            segment.arrival.format(DATETIME_FORMAT)
        )?;

        if segment.num_legs > 1 {
            writeln!(out, "Multiple Legs: {}", segment.num_legs)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{decode, parse_response, SAMPLE_RESPONSE};

    fn sample(attempted: usize, successes: usize, copies: usize) -> Aggregation {
        let response = parse_response(SAMPLE_RESPONSE.as_bytes()).unwrap();
        let option = decode(&response).unwrap().options.remove(0);
        Aggregation {
            options: vec![option; copies],
            attempted,
            successes,
        }
    }

    fn rendered(aggregated: &Aggregation, top_n: usize) -> String {
        let mut out = Vec::new();
        render(&mut out, aggregated, top_n).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_summary_lines() {
        assert_eq!(
            summary_line(&sample(3, 3, 0)),
            "All 3 queries returned successfully!"
        );
        assert_eq!(
            summary_line(&sample(5, 2, 0)),
            "Errors! Only 2/5 queries returned successfully."
        );
    }

    #[test]
    fn test_option_details() {
        let text = rendered(&sample(1, 1, 1), 10);

        assert!(text.starts_with("All 1 queries returned successfully!\n"));
        assert!(text.contains("Cost:       $316.40\n"));
        assert!(text.contains("Outbound:   SFO -> ORD\n"));
        assert!(text.contains("Flight:     UA 1234 (United Airlines, Inc.)\n"));
        assert!(text.contains("Departure:  Wed Mar 29 07:00 AM -07:00\n"));
        assert!(text.contains("Inbound:    ORD -> SFO\n"));
        assert!(text.contains("Multiple Legs: 2\n"));
        assert_eq!(text.matches("Multiple Legs").count(), 1);
    }

    #[test]
    fn test_listing_is_capped_at_top_n() {
        let text = rendered(&sample(4, 4, 4), 2);
        assert_eq!(text.matches("Cost:").count(), 2);

        let text = rendered(&sample(4, 4, 4), 10);
        assert_eq!(text.matches("Cost:").count(), 4);
    }

    #[test]
    fn test_no_options_prints_only_summary() {
        let text = rendered(&sample(2, 0, 0), 10);
        assert_eq!(text, "Errors! Only 0/2 queries returned successfully.\n");
    }
}
