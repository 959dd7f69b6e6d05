//! The CASL II subroutines that generated code calls into.

/// The bundled library, appended after `END` unless the driver is given
/// another one.
pub const LIBRARY: &str = include_str!("lib.cas");

/// Entry points the generated code may `CALL`.
pub const ROUTINES: [&str; 10] = [
    "RDINT", "RDCH", "RDSTR", "RDLN", "WRTINT", "WRTCH", "WRTSTR", "WRTLN", "MULT", "DIV",
];

/// Append `library` to generated code, keeping every line terminated.
pub fn append(asm: &mut String, library: &str) {
    if !asm.is_empty() && !asm.ends_with('\n') {
        asm.push('\n');
    }
    asm.push_str(library);
    if !library.is_empty() && !library.ends_with('\n') {
        asm.push('\n');
    }
}

/// Routines from [`ROUTINES`] that `library` does not define with `START`.
pub fn missing_routines(library: &str) -> Vec<&'static str> {
    ROUTINES
        .iter()
        .copied()
        .filter(|name| {
            !library.lines().any(|line| {
                let mut columns = line.split_whitespace();
                !line.starts_with(char::is_whitespace)
                    && columns.next() == Some(*name)
                    && columns.next() == Some("START")
            })
        })
        .collect()
}
