//! Presentación de diagnósticos.
//!
//! Las fases del compilador acumulan errores como valores
//! [`Located`], cada uno con su ubicación original. Este módulo los
//! agrupa en un [`Diagnostics`] cuyo `Display` cita la línea de
//! código ofensiva y subraya el rango señalado.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Un error cualquiera con ubicación conocida.
pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Colección presentable de errores de una corrida.
pub struct Diagnostics {
    kind: &'static str,
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    /// Etiqueta cada error con una clase común, p.ej. "Syntax error".
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Cantidad de errores acumulados.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Indica si no hay errores que presentar.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            kind: "error",
            errors: Default::default(),
        }
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
            ..Default::default()
        }
    }
}

impl<E: 'static + LocatedError> From<Vec<E>> for Diagnostics {
    fn from(errors: Vec<E>) -> Self {
        let errors = errors
            .into_iter()
            .map(|error| Box::new(error) as Box<dyn LocatedError>)
            .collect();

        Diagnostics {
            errors,
            ..Default::default()
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            writeln!(fmt, "{}: {}", kind, error.source())?;

            let location = error.location();
            writeln!(fmt, " --> {}", location)?;

            let last_line = location.end().line();
            let digits = last_line.to_string().len();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            for line in location.start().line()..=last_line {
                location.source().with_line(line, |text| {
                    writeln!(fmt, "{:>digits$} | {}", line, text, digits = digits)
                })?;
            }

            // El subrayado solo es preciso para rangos de una línea
            let from = location.start().column();
            let to = location.end().column().saturating_sub(1);
            let (from, to) = (from.min(to), from.max(to));

            let skip = from.saturating_sub(1) as usize;
            let underline = (to - from + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<underline$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                underline = underline
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}
