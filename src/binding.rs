use rust_decimal::Decimal;
use std::fmt::{self, Write};
use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use time::{Date, PrimitiveDateTime, Time, UtcOffset};
use url::Url;

/// Generic SQL type code, used by null bindings and typed object bindings.
///
/// The numeric values are the standard driver type codes, so codes coming
/// from other proxies or drivers can be passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlType(pub i32);

impl SqlType {
    pub const BIT: SqlType = SqlType(-7);
    pub const TINYINT: SqlType = SqlType(-6);
    pub const SMALLINT: SqlType = SqlType(5);
    pub const INTEGER: SqlType = SqlType(4);
    pub const BIGINT: SqlType = SqlType(-5);
    pub const FLOAT: SqlType = SqlType(6);
    pub const REAL: SqlType = SqlType(7);
    pub const DOUBLE: SqlType = SqlType(8);
    pub const NUMERIC: SqlType = SqlType(2);
    pub const DECIMAL: SqlType = SqlType(3);
    pub const CHAR: SqlType = SqlType(1);
    pub const VARCHAR: SqlType = SqlType(12);
    pub const LONGVARCHAR: SqlType = SqlType(-1);
    pub const DATE: SqlType = SqlType(91);
    pub const TIME: SqlType = SqlType(92);
    pub const TIMESTAMP: SqlType = SqlType(93);
    pub const BINARY: SqlType = SqlType(-2);
    pub const VARBINARY: SqlType = SqlType(-3);
    pub const LONGVARBINARY: SqlType = SqlType(-4);
    pub const NULL: SqlType = SqlType(0);
    pub const OTHER: SqlType = SqlType(1111);
    pub const ARRAY: SqlType = SqlType(2003);
    pub const BLOB: SqlType = SqlType(2004);
    pub const CLOB: SqlType = SqlType(2005);
    pub const BOOLEAN: SqlType = SqlType(16);
    pub const ROWID: SqlType = SqlType(-8);
    pub const NCHAR: SqlType = SqlType(-15);
    pub const NVARCHAR: SqlType = SqlType(-9);
    pub const NCLOB: SqlType = SqlType(2011);
    pub const SQLXML: SqlType = SqlType(2009);
}

/// Shareable handle on a stream parameter.
///
/// Cloning the handle does not copy the stream: every clone reads from the
/// same underlying reader. The reader is drained on the first read and its
/// bytes are kept, so every later read returns the same payload.
#[derive(Clone)]
pub struct BindStream(Arc<Mutex<StreamState>>);

enum StreamState {
    Pending(Box<dyn Read + Send>),
    Drained(Arc<[u8]>),
}

impl BindStream {
    pub fn new<R>(reader: R) -> Self
    where
        R: Read + Send + 'static,
    {
        BindStream(Arc::new(Mutex::new(StreamState::Pending(Box::new(reader)))))
    }

    fn payload(&self) -> io::Result<Arc<[u8]>> {
        let mut state = self
            .0
            .lock()
            .map_err(|_| io::Error::other("stream parameter lock poisoned"))?;
        let bytes: Arc<[u8]> = match &mut *state {
            StreamState::Drained(bytes) => return Ok(bytes.clone()),
            StreamState::Pending(reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer)?;
                buffer.into()
            }
        };
        *state = StreamState::Drained(bytes.clone());
        Ok(bytes)
    }

    /// The whole payload of the stream.
    pub fn read_to_end(&self) -> io::Result<Vec<u8>> {
        Ok(self.payload()?.to_vec())
    }

    /// The whole payload of the stream as UTF-8 text.
    pub fn read_to_string(&self) -> io::Result<String> {
        String::from_utf8(self.read_to_end()?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl fmt::Debug for BindStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BindStream(..)")
    }
}

impl PartialEq for BindStream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A single parameter binding operation, with its typed arguments.
///
/// One variant per binding kind of the prepared statement surface. Variants
/// carrying a [`BindStream`] have no SQL literal form, every other variant can
/// be rendered into the routing probe with [`Binding::literal`].
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Null {
        sql_type: SqlType,
        type_name: Option<String>,
    },
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    NString(String),
    Bytes(Vec<u8>),
    Date(Date, Option<UtcOffset>),
    Time(Time, Option<UtcOffset>),
    Timestamp(PrimitiveDateTime, Option<UtcOffset>),
    Url(Url),
    Blob(Vec<u8>),
    Clob(String),
    NClob(String),
    SqlXml(String),
    RowId(Vec<u8>),
    Array(Vec<Binding>),
    Object {
        value: Box<Binding>,
        target_sql_type: Option<SqlType>,
        scale_or_length: Option<i32>,
    },
    AsciiStream {
        stream: BindStream,
        length: Option<u64>,
    },
    BinaryStream {
        stream: BindStream,
        length: Option<u64>,
    },
    UnicodeStream {
        stream: BindStream,
        length: u32,
    },
    CharacterStream {
        stream: BindStream,
        length: Option<u64>,
    },
    NCharacterStream {
        stream: BindStream,
        length: Option<u64>,
    },
    BlobStream {
        stream: BindStream,
        length: Option<u64>,
    },
    ClobStream {
        stream: BindStream,
        length: Option<u64>,
    },
    NClobStream {
        stream: BindStream,
        length: Option<u64>,
    },
}

impl Binding {
    /// Name of the logical binding operation.
    pub fn operation(&self) -> &'static str {
        match self {
            Binding::Null { .. } => "set_null",
            Binding::Boolean(..) => "set_boolean",
            Binding::Byte(..) => "set_byte",
            Binding::Short(..) => "set_short",
            Binding::Int(..) => "set_int",
            Binding::Long(..) => "set_long",
            Binding::Float(..) => "set_float",
            Binding::Double(..) => "set_double",
            Binding::Decimal(..) => "set_decimal",
            Binding::String(..) => "set_string",
            Binding::NString(..) => "set_nstring",
            Binding::Bytes(..) => "set_bytes",
            Binding::Date(..) => "set_date",
            Binding::Time(..) => "set_time",
            Binding::Timestamp(..) => "set_timestamp",
            Binding::Url(..) => "set_url",
            Binding::Blob(..) => "set_blob",
            Binding::Clob(..) => "set_clob",
            Binding::NClob(..) => "set_nclob",
            Binding::SqlXml(..) => "set_sqlxml",
            Binding::RowId(..) => "set_row_id",
            Binding::Array(..) => "set_array",
            Binding::Object { .. } => "set_object",
            Binding::AsciiStream { .. } => "set_ascii_stream",
            Binding::BinaryStream { .. } => "set_binary_stream",
            Binding::UnicodeStream { .. } => "set_unicode_stream",
            Binding::CharacterStream { .. } => "set_character_stream",
            Binding::NCharacterStream { .. } => "set_ncharacter_stream",
            Binding::BlobStream { .. } => "set_blob_stream",
            Binding::ClobStream { .. } => "set_clob_stream",
            Binding::NClobStream { .. } => "set_nclob_stream",
        }
    }

    /// Whether the binding carries a stream, possibly nested in an array or
    /// object. Stream bindings keep their placeholder in the routing probe.
    pub fn is_stream(&self) -> bool {
        match self {
            Binding::AsciiStream { .. }
            | Binding::BinaryStream { .. }
            | Binding::UnicodeStream { .. }
            | Binding::CharacterStream { .. }
            | Binding::NCharacterStream { .. }
            | Binding::BlobStream { .. }
            | Binding::ClobStream { .. }
            | Binding::NClobStream { .. } => true,
            Binding::Array(values) => values.iter().any(Binding::is_stream),
            Binding::Object { value, .. } => value.is_stream(),
            _ => false,
        }
    }

    /// Best-effort SQL literal used in the routing probe.
    ///
    /// Text is wrapped in single quotes without escaping: the probe is only
    /// ever read by the router, it is never executed. Returns `None` for
    /// stream bindings, whose placeholder stays `?`.
    pub fn literal(&self) -> Option<String> {
        let mut out = String::new();
        self.write_literal(&mut out).then_some(out)
    }

    fn write_literal(&self, out: &mut String) -> bool {
        match self {
            Binding::Null { .. } => out.push_str("NULL"),
            Binding::Boolean(v) => out.push_str(["false", "true"][*v as usize]),
            Binding::Byte(v) => drop(write!(out, "{v}")),
            Binding::Short(v) => drop(write!(out, "{v}")),
            Binding::Int(v) => drop(write!(out, "{v}")),
            Binding::Long(v) => drop(write!(out, "{v}")),
            Binding::Float(v) => drop(write!(out, "{v}")),
            Binding::Double(v) => drop(write!(out, "{v}")),
            Binding::Decimal(v) => drop(write!(out, "{v}")),
            Binding::String(v)
            | Binding::NString(v)
            | Binding::Clob(v)
            | Binding::NClob(v)
            | Binding::SqlXml(v) => drop(write!(out, "'{v}'")),
            Binding::Bytes(v) | Binding::Blob(v) | Binding::RowId(v) => write_hex(out, v),
            Binding::Date(v, ..) => {
                out.push('\'');
                write_date(out, v);
                out.push('\'');
            }
            Binding::Time(v, ..) => {
                out.push('\'');
                write_time(out, v);
                out.push('\'');
            }
            Binding::Timestamp(v, ..) => {
                out.push('\'');
                write_date(out, &v.date());
                out.push(' ');
                write_time(out, &v.time());
                out.push('\'');
            }
            Binding::Url(v) => drop(write!(out, "'{v}'")),
            Binding::Array(values) => {
                out.push('(');
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if !value.write_literal(out) {
                        return false;
                    }
                }
                out.push(')');
            }
            Binding::Object { value, .. } => return value.write_literal(out),
            _ => return false,
        }
        true
    }
}

fn write_hex(out: &mut String, value: &[u8]) {
    out.push_str("X'");
    for b in value {
        let _ = write!(out, "{:02X}", b);
    }
    out.push('\'');
}

fn write_date(out: &mut String, value: &Date) {
    let _ = write!(
        out,
        "{:04}-{:02}-{:02}",
        value.year(),
        value.month() as u8,
        value.day()
    );
}

fn write_time(out: &mut String, value: &Time) {
    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        value.hour(),
        value.minute(),
        value.second()
    );
    let mut subsecond = value.nanosecond();
    if subsecond != 0 {
        let mut width = 9;
        while subsecond % 10 == 0 {
            subsecond /= 10;
            width -= 1;
        }
        let _ = write!(out, ".{:0width$}", subsecond);
    }
}

macro_rules! impl_from_binding {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for Binding {
                fn from(value: $source) -> Self {
                    Binding::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_binding!(
    bool => Boolean,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    Url => Url,
    Vec<Binding> => Array,
);

impl From<Date> for Binding {
    fn from(value: Date) -> Self {
        Binding::Date(value, None)
    }
}

impl From<Time> for Binding {
    fn from(value: Time) -> Self {
        Binding::Time(value, None)
    }
}

impl From<PrimitiveDateTime> for Binding {
    fn from(value: PrimitiveDateTime) -> Self {
        Binding::Timestamp(value, None)
    }
}
