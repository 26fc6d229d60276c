use std::fmt::{self, Display};
use std::io::{self, Write};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::build::BuildOutcome;
use crate::cli::listing::PlatformListing;

/// Log line layout for stderr: warnings and errors raised anywhere in the
/// crate (release failures included) carry the same `Warning: ` / `Error: `
/// prefixes as [`print_warning`] and [`print_error`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SeverityFormat;

impl SeverityFormat {
    fn prefix(level: &Level) -> &'static str {
        if *level == Level::ERROR {
            "Error: "
        } else if *level == Level::WARN {
            "Warning: "
        } else if *level == Level::INFO {
            ""
        } else if *level == Level::DEBUG {
            "debug: "
        } else {
            "trace: "
        }
    }
}

impl<S, N> FormatEvent<S, N> for SeverityFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{}", Self::prefix(event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Print a fatal diagnostic to stderr
pub fn print_error(message: impl Display) {
    eprintln!("Error: {message}");
}

/// Print a non-fatal diagnostic to stderr
pub fn print_warning(message: impl Display) {
    eprintln!("Warning: {message}");
}

/// Build log (or generic failure line) to stdout, warnings to stderr
pub fn print_build_outcome(outcome: &BuildOutcome) {
    if let Some(diagnostics) = outcome.diagnostics() {
        println!("{}", diagnostics.trim_end());
    }
    for warning in &outcome.warnings {
        print_warning(warning);
    }
}

/// Render the platform listing in the classic text layout
pub fn write_listing(out: &mut impl Write, listing: &[PlatformListing]) -> io::Result<()> {
    if listing.is_empty() {
        writeln!(out, "No OpenCL platforms found")?;
        return Ok(());
    }

    for platform in listing {
        writeln!(
            out,
            "Platform #{}: {} [{}]",
            platform.index, platform.name, platform.version
        )?;
        for device in &platform.devices {
            writeln!(
                out,
                "\tDevice #{} [{}]: {}",
                device.index,
                device.device_type,
                device.display_name()
            )?;
        }
    }
    Ok(())
}

pub fn print_listing(listing: &[PlatformListing]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_listing(&mut out, listing)
}

/// Print the platform listing in JSON format
pub fn print_listing_json(listing: &[PlatformListing]) -> Result<(), serde_json::Error> {
    let json_output = serde_json::to_string_pretty(listing)?;
    println!("{}", json_output);
    Ok(())
}
