use hashbrown::HashMap;
use log::trace;

use crate::err::{TemplateError, TemplateResult};
use crate::template::definition::TemplateEntry;
use crate::template::kind::{
    CountSource, ElementKind, IntFormat, KeySource, ListEnd, Marker, Padding,
};
use crate::template::params;
use crate::type_code::TypeCode;

type FastMap<K, V> = HashMap<K, V, ahash::RandomState>;

/// What a factory gets to build an element kind from.
#[derive(Debug, Clone, Copy)]
pub struct EntrySpec<'a> {
    pub code: TypeCode,
    pub label: &'a str,
    /// The size encoded by a family code's three hex digits (`P020` -> 32).
    pub size: Option<usize>,
}

/// Builds an element kind from a template entry, or explains why the label is unusable.
pub type Factory = fn(&EntrySpec<'_>) -> Result<ElementKind, String>;

/// Maps type codes to element factories.
///
/// Exact codes are looked up first. Codes with no exact registration fall back to a family
/// registered under their first byte, provided the remaining three bytes are hex digits.
#[derive(Clone)]
pub struct Registry {
    exact: FastMap<TypeCode, Factory>,
    families: FastMap<u8, Factory>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut codes: Vec<_> = self.exact.keys().map(|c| c.to_string()).collect();
        codes.sort();
        let mut families: Vec<_> = self
            .families
            .keys()
            .map(|&p| format!("{}nnn", p as char))
            .collect();
        families.sort();
        f.debug_struct("Registry")
            .field("exact", &codes)
            .field("families", &families)
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::standard()
    }
}

impl Registry {
    /// A registry that knows no codes at all.
    pub fn empty() -> Self {
        Registry {
            exact: FastMap::default(),
            families: FastMap::default(),
        }
    }

    /// Registers `factory` for `code`, returning the factory it replaces.
    pub fn register(&mut self, code: TypeCode, factory: Factory) -> Option<Factory> {
        self.exact.insert(code, factory)
    }

    /// Registers `factory` for every `<prefix>nnn` code.
    pub fn register_family(&mut self, prefix: u8, factory: Factory) -> Option<Factory> {
        self.families.insert(prefix, factory)
    }

    pub fn contains(&self, code: TypeCode) -> bool {
        self.lookup(code).is_some()
    }

    fn lookup(&self, code: TypeCode) -> Option<(Factory, Option<usize>)> {
        if let Some(f) = self.exact.get(&code) {
            return Some((*f, None));
        }
        let size = code.numeric_suffix()?;
        self.families.get(&code.prefix()).map(|f| (*f, Some(size)))
    }

    /// Build the element kind for the `index`th template entry.
    pub fn instantiate(&self, entry: &TemplateEntry, index: usize) -> TemplateResult<ElementKind> {
        let (factory, size) =
            self.lookup(entry.code)
                .ok_or_else(|| TemplateError::UnknownTypeCode {
                    code: entry.code,
                    label: entry.label.clone(),
                    index,
                })?;

        let spec = EntrySpec {
            code: entry.code,
            label: &entry.label,
            size,
        };

        let kind = factory(&spec).map_err(|reason| TemplateError::InvalidLabel {
            code: entry.code,
            label: entry.label.clone(),
            index,
            reason,
        })?;
        check_kind(&kind).map_err(|reason| TemplateError::InvalidLabel {
            code: entry.code,
            label: entry.label.clone(),
            index,
            reason,
        })?;
        trace!("entry {index}: `{}` -> {kind:?}", entry.code);
        Ok(kind)
    }

    /// Every type code of the classic template vocabulary.
    pub fn standard() -> Self {
        let mut r = Registry::empty();

        r.register(TypeCode::new(*b"DBYT"), |_| {
            Ok(ElementKind::Integer(IntFormat::signed(1)))
        });
        r.register(TypeCode::new(*b"DWRD"), |_| {
            Ok(ElementKind::Integer(IntFormat::signed(2)))
        });
        r.register(TypeCode::new(*b"DLNG"), |_| {
            Ok(ElementKind::Integer(IntFormat::signed(4)))
        });
        r.register(TypeCode::new(*b"DQWD"), |_| {
            Ok(ElementKind::Integer(IntFormat::signed(8)))
        });

        r.register(TypeCode::new(*b"UBYT"), |_| {
            Ok(ElementKind::Integer(IntFormat::unsigned(1)))
        });
        r.register(TypeCode::new(*b"UWRD"), |_| {
            Ok(ElementKind::Integer(IntFormat::unsigned(2)))
        });
        r.register(TypeCode::new(*b"ULNG"), |_| {
            Ok(ElementKind::Integer(IntFormat::unsigned(4)))
        });
        r.register(TypeCode::new(*b"UQWD"), |_| {
            Ok(ElementKind::Integer(IntFormat::unsigned(8)))
        });

        r.register(TypeCode::new(*b"HBYT"), |_| {
            Ok(ElementKind::Integer(IntFormat::hex(1)))
        });
        r.register(TypeCode::new(*b"HWRD"), |_| {
            Ok(ElementKind::Integer(IntFormat::hex(2)))
        });
        r.register(TypeCode::new(*b"HLNG"), |_| {
            Ok(ElementKind::Integer(IntFormat::hex(4)))
        });
        r.register(TypeCode::new(*b"HQWD"), |_| {
            Ok(ElementKind::Integer(IntFormat::hex(8)))
        });

        r.register(TypeCode::new(*b"REAL"), |_| Ok(ElementKind::Float { width: 4 }));
        r.register(TypeCode::new(*b"DOUB"), |_| Ok(ElementKind::Float { width: 8 }));
        r.register(TypeCode::new(*b"DATE"), |_| Ok(ElementKind::Date));
        r.register(TypeCode::new(*b"RECT"), |_| Ok(ElementKind::Rect));
        r.register(TypeCode::new(*b"PNT "), |_| Ok(ElementKind::Point));

        r.register(TypeCode::new(*b"FBYT"), |_| Ok(ElementKind::Filler { len: 1 }));
        r.register(TypeCode::new(*b"FWRD"), |_| Ok(ElementKind::Filler { len: 2 }));
        r.register(TypeCode::new(*b"FLNG"), |_| Ok(ElementKind::Filler { len: 4 }));
        r.register_family(b'F', |spec| {
            Ok(ElementKind::Filler {
                len: sized(spec)?,
            })
        });
        r.register(TypeCode::new(*b"AWRD"), |_| Ok(ElementKind::Align { to: 2 }));
        r.register(TypeCode::new(*b"ALNG"), |_| Ok(ElementKind::Align { to: 4 }));

        r.register(TypeCode::new(*b"CSTR"), |_| {
            Ok(ElementKind::BoundedString {
                padding: Padding::Terminator,
            })
        });
        r.register(TypeCode::new(*b"OCST"), |_| {
            Ok(ElementKind::BoundedString {
                padding: Padding::OddPlusOne,
            })
        });
        r.register(TypeCode::new(*b"ECST"), |_| {
            Ok(ElementKind::BoundedString {
                padding: Padding::EvenPlusOne,
            })
        });
        r.register_family(b'C', |spec| {
            let size = sized(spec)?;
            if size == 0 {
                return Err("fixed C string needs room for its terminator".to_string());
            }
            Ok(ElementKind::BoundedString {
                padding: Padding::Fixed(size),
            })
        });

        r.register(TypeCode::new(*b"PSTR"), |_| Ok(pascal(1, Padding::None)));
        r.register(TypeCode::new(*b"BSTR"), |_| Ok(pascal(1, Padding::None)));
        r.register(TypeCode::new(*b"OSTR"), |_| Ok(pascal(1, Padding::Odd)));
        r.register(TypeCode::new(*b"ESTR"), |_| Ok(pascal(1, Padding::Even)));
        r.register(TypeCode::new(*b"WSTR"), |_| Ok(pascal(2, Padding::None)));
        r.register(TypeCode::new(*b"LSTR"), |_| {
            Ok(ElementKind::PrefixedString {
                prefix: 4,
                padding: Padding::None,
                max: i32::MAX as usize,
            })
        });
        r.register_family(b'P', |spec| {
            let size = sized(spec)?;
            if size == 0 {
                return Err("fixed Pascal string needs room for its length byte".to_string());
            }
            Ok(ElementKind::PrefixedString {
                prefix: 1,
                padding: Padding::Fixed(size),
                max: (size - 1).min(255),
            })
        });

        r.register(TypeCode::new(*b"BHEX"), |_| Ok(blob(1, false)));
        r.register(TypeCode::new(*b"WHEX"), |_| Ok(blob(2, false)));
        r.register(TypeCode::new(*b"LHEX"), |_| Ok(blob(4, false)));
        r.register(TypeCode::new(*b"BSHX"), |_| Ok(blob(1, true)));
        r.register(TypeCode::new(*b"WSHX"), |_| Ok(blob(2, true)));
        r.register(TypeCode::new(*b"LSHX"), |_| Ok(blob(4, true)));
        r.register_family(b'H', |spec| {
            Ok(ElementKind::FixedBlob {
                len: sized(spec)?,
            })
        });
        r.register(TypeCode::new(*b"HEXD"), |_| Ok(ElementKind::TrailingBlob));
        r.register(TypeCode::new(*b"TEXT"), |_| Ok(ElementKind::TrailingText));
        r.register(TypeCode::new(*b"DVDR"), |_| Ok(ElementKind::Divider));

        r.register(TypeCode::new(*b"BCNT"), |_| Ok(counter(1, false)));
        r.register(TypeCode::new(*b"WCNT"), |_| Ok(counter(2, false)));
        r.register(TypeCode::new(*b"OCNT"), |_| Ok(counter(2, false)));
        r.register(TypeCode::new(*b"LCNT"), |_| Ok(counter(4, false)));
        r.register(TypeCode::new(*b"ZCNT"), |_| Ok(counter(2, true)));
        r.register(TypeCode::new(*b"LZCT"), |_| Ok(counter(4, true)));
        r.register(TypeCode::new(*b"FCNT"), |spec| {
            let (_, count) = params::parse_static_count(spec.label)?;
            Ok(ElementKind::Counter(CountSource::Static(count)))
        });

        r.register(TypeCode::new(*b"LSTC"), |_| {
            Ok(ElementKind::Marker(Marker::ListStart))
        });
        r.register(TypeCode::new(*b"LSTE"), |_| Ok(ElementKind::Marker(Marker::ListEnd)));
        r.register(TypeCode::new(*b"LSTB"), |_| Ok(ElementKind::List(ListEnd::EndOfData)));
        r.register(TypeCode::new(*b"LSTZ"), |_| Ok(ElementKind::List(ListEnd::ZeroByte)));

        r.register(TypeCode::new(*b"KBYT"), |_| Ok(keyed(IntFormat::signed(1))));
        r.register(TypeCode::new(*b"KWRD"), |_| Ok(keyed(IntFormat::signed(2))));
        r.register(TypeCode::new(*b"KLNG"), |_| Ok(keyed(IntFormat::signed(4))));
        r.register(TypeCode::new(*b"KUBT"), |_| Ok(keyed(IntFormat::unsigned(1))));
        r.register(TypeCode::new(*b"KUWD"), |_| Ok(keyed(IntFormat::unsigned(2))));
        r.register(TypeCode::new(*b"KULG"), |_| Ok(keyed(IntFormat::unsigned(4))));
        r.register(TypeCode::new(*b"KRID"), |_| {
            Ok(ElementKind::Keyed(KeySource::RecordId))
        });
        r.register(TypeCode::new(*b"CASE"), |spec| {
            Ok(ElementKind::Case(params::parse_case(spec.label)?))
        });
        r.register(TypeCode::new(*b"KEYB"), |_| {
            Ok(ElementKind::Marker(Marker::SectionStart))
        });
        r.register(TypeCode::new(*b"KEYE"), |_| {
            Ok(ElementKind::Marker(Marker::SectionEnd))
        });

        r.register(TypeCode::new(*b"RREF"), |spec| {
            let (_, target) = params::parse_reference(spec.label)?;
            Ok(ElementKind::Reference(target))
        });

        r
    }
}

fn sized(spec: &EntrySpec<'_>) -> Result<usize, String> {
    spec.size
        .ok_or_else(|| format!("`{}` does not encode a size", spec.code))
}

fn pascal(prefix: usize, padding: Padding) -> ElementKind {
    ElementKind::PrefixedString {
        prefix,
        padding,
        max: IntFormat::unsigned(prefix).max() as usize,
    }
}

fn blob(prefix: usize, includes_prefix: bool) -> ElementKind {
    ElementKind::PrefixedBlob {
        prefix,
        includes_prefix,
    }
}

fn counter(width: usize, zero_based: bool) -> ElementKind {
    ElementKind::Counter(CountSource::Data { width, zero_based })
}

fn keyed(format: IntFormat) -> ElementKind {
    ElementKind::Keyed(KeySource::Data(format))
}

/// Rejects kinds the codec cannot read or write, which custom factories are free to build.
fn check_kind(kind: &ElementKind) -> Result<(), String> {
    let width = match *kind {
        ElementKind::Integer(format) | ElementKind::Keyed(KeySource::Data(format)) => format.width,
        ElementKind::Counter(CountSource::Data { width, .. }) => width,
        ElementKind::PrefixedString { prefix, .. } | ElementKind::PrefixedBlob { prefix, .. } => {
            prefix
        }
        ElementKind::Float { width } if width != 4 && width != 8 => {
            return Err(format!("float width {width} is not 4 or 8"));
        }
        ElementKind::Align { to: 0 } => return Err("alignment must be at least 1".to_string()),
        _ => return Ok(()),
    };
    if (1..=8).contains(&width) {
        Ok(())
    } else {
        Err(format!("integer width {width} is not between 1 and 8"))
    }
}
