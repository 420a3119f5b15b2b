//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye deben
//! llevar cuenta de posiciones o rangos de ubicaciones en el código
//! fuente original, lo cual permite determinar un punto exacto o
//! aproximado en donde ocurre un error de abstracción arbitraria.

use std::{
    cell::RefCell,
    fmt::{self, Debug, Display, Formatter},
    io::{self, BufRead},
    iter,
    ops::Range,
    rc::Rc,
};

/// Ancho de los divisores de tabulador.
const TAB_STOP: u32 = 4;

/// Un flujo de entrada, carácter por carácter.
///
/// Cada carácter emitido se acompaña de la ubicación que le
/// corresponderá al carácter siguiente.
pub trait InputStream: Iterator<Item = Result<(char, Location), io::Error>> {}

impl<S: Iterator<Item = Result<(char, Location), io::Error>>> InputStream for S {}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un origen y un rango de posiciones.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<Position>,
}

impl Location {
    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Obtiene la posición de inicio.
    pub fn start(&self) -> Position {
        self.position.start
    }

    /// Obtiene la posición de fin.
    pub fn end(&self) -> Position {
        self.position.end
    }

    /// Obtiene el origen del cual deriva esta ubicación.
    pub(crate) fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end == start.advance() {
            // Solo se señala una columna en específico
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Una posición línea-columna en un archivo.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Obtiene el número de línea.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Obtiene el número de columna.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Incrementa el número de columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Decrementa el número de columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1),
        }
    }

    /// Incrementa el número de línea y retorna a la columna 1.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Ajusta la posición a la siguiente columna de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Transforma un lector estándar en un flujo de caracteres ubicados.
///
/// La ubicación en la tupla de retorno es la posición que le
/// corresponderá al primer carácter en la salida. El flujo retiene
/// cada línea leída, de manera que el reporte de errores pueda citar
/// el texto original.
pub fn consume<R, S>(reader: R, name: S) -> (Location, Chars<R>)
where
    R: BufRead,
    S: Into<String>,
{
    let source = Rc::new(Source {
        name: name.into(),
        lines: Default::default(),
    });

    let start = Location {
        from: Rc::clone(&source),
        position: Position::default()..Position::default().advance(),
    };

    let chars = Chars {
        from: source,
        reader,
        line: Vec::new(),
        cursor: 0,
        ahead: Position::default(),
        done: false,
    };

    (start, chars)
}

/// Iterador que descompone un lector línea por línea en caracteres.
///
/// Cada línea emite un `'\n'` final, exista o no en la entrada. Si
/// ocurre un error de E/S, este se emite una única vez y el flujo
/// termina.
pub struct Chars<R> {
    from: Rc<Source>,
    reader: R,
    line: Vec<char>,
    cursor: usize,
    ahead: Position,
    done: bool,
}

impl<R: BufRead> Iterator for Chars<R> {
    type Item = Result<(char, Location), io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.cursor >= self.line.len() {
            let mut text = String::new();
            match self.reader.read_line(&mut text) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }

                Ok(_) => (),

                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }

            while text.ends_with('\n') || text.ends_with('\r') {
                text.pop();
            }

            self.line = text.chars().chain(iter::once('\n')).collect();
            self.cursor = 0;
            self.from.lines.borrow_mut().push(text);
        }

        let c = self.line[self.cursor];
        self.cursor += 1;

        self.ahead = match c {
            '\n' => self.ahead.newline(),
            '\t' => self.ahead.tab(),
            _ => self.ahead.advance(),
        };

        let location = Location {
            from: Rc::clone(&self.from),
            position: self.ahead..self.ahead.advance(),
        };

        Some(Ok((c, location)))
    }
}

/// Nombre de origen e histórico interior de líneas.
pub(crate) struct Source {
    name: String,
    lines: RefCell<Vec<String>>,
}

impl Source {
    /// Ejecuta un callback sobre el texto de una línea, si ya fue leída.
    pub fn with_line<E, F>(&self, line: u32, callback: F) -> Result<(), E>
    where
        F: FnOnce(&str) -> Result<(), E>,
    {
        let lines = self.lines.borrow();
        match lines.get(line.saturating_sub(1) as usize) {
            Some(text) => callback(text),
            None => Ok(()),
        }
    }
}
