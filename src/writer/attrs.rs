//! Attribute encoders.
//!
//! Each encoder renders one semantic property as ` name='value'`, or writes
//! nothing when the property is absent or has its default value. Emitting an
//! attribute the graph did not carry would break round-tripping, so the
//! omission rules here are part of the format.

use crate::model::{
    AccessSpecifier, Binding, CvQualifiers, Location, LocationManager, Visibility,
};
use quick_xml::escape::escape;
use std::io::{self, Write};

/// Write ` key='value'`, escaping `value`.
pub fn write_attr<W: Write>(out: &mut W, key: &str, value: &str) -> io::Result<()> {
    write!(out, " {}='{}'", key, escape(value))
}

/// Write ` key='value'` for `Some` values only.
pub fn write_optional_attr<W: Write>(out: &mut W, key: &str, value: Option<&str>) -> io::Result<()> {
    match value {
        Some(value) => write_attr(out, key, value),
        None => Ok(()),
    }
}

/// Write ` key='yes'` when `flag` is set.
pub fn write_flag<W: Write>(out: &mut W, key: &str, flag: bool) -> io::Result<()> {
    if flag {
        write!(out, " {}='yes'", key)?;
    }
    Ok(())
}

/// Write ` key='N'` when `value` is nonzero.
pub fn write_nonzero<W: Write>(out: &mut W, key: &str, value: u64) -> io::Result<()> {
    if value != 0 {
        write!(out, " {}='{}'", key, value)?;
    }
    Ok(())
}

pub fn write_location<W: Write>(
    out: &mut W,
    locations: &LocationManager,
    location: Location,
) -> io::Result<()> {
    if let Some(expanded) = locations.expand_location(location) {
        write_attr(out, "filepath", expanded.path)?;
        write!(out, " line='{}' column='{}'", expanded.line, expanded.column)?;
    }
    Ok(())
}

pub fn write_visibility<W: Write>(out: &mut W, visibility: Visibility) -> io::Result<()> {
    write_optional_attr(out, "visibility", visibility.as_attr())
}

pub fn write_binding<W: Write>(out: &mut W, binding: Binding) -> io::Result<()> {
    write_optional_attr(out, "binding", binding.as_attr())
}

pub fn write_size_and_alignment<W: Write>(
    out: &mut W,
    size_in_bits: u64,
    alignment_in_bits: u64,
) -> io::Result<()> {
    write_nonzero(out, "size-in-bits", size_in_bits)?;
    write_nonzero(out, "alignment-in-bits", alignment_in_bits)
}

/// Members always carry their access; `private` is only the default for
/// members that never had one set.
pub fn write_access<W: Write>(out: &mut W, access: AccessSpecifier) -> io::Result<()> {
    write!(out, " access='{}'", access.as_attr())
}

pub fn write_layout_offset<W: Write>(out: &mut W, offset_in_bits: Option<u64>) -> io::Result<()> {
    if let Some(offset) = offset_in_bits {
        write!(out, " layout-offset-in-bits='{}'", offset)?;
    }
    Ok(())
}

pub fn write_cv_qualifiers<W: Write>(out: &mut W, cv: CvQualifiers) -> io::Result<()> {
    write_flag(out, "const", cv.contains(CvQualifiers::CONST))?;
    write_flag(out, "volatile", cv.contains(CvQualifiers::VOLATILE))?;
    write_flag(out, "restrict", cv.contains(CvQualifiers::RESTRICT))
}

pub fn write_indent<W: Write>(out: &mut W, indent: usize) -> io::Result<()> {
    write!(out, "{:indent$}", "", indent = indent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).expect("writing to a Vec cannot fail");
        String::from_utf8(out).expect("UTF8 output")
    }

    #[test]
    fn test_absent_values_render_nothing() {
        assert_eq!(render(|o| write_visibility(o, Visibility::None)), "");
        assert_eq!(render(|o| write_binding(o, Binding::None)), "");
        assert_eq!(render(|o| write_size_and_alignment(o, 0, 0)), "");
        assert_eq!(render(|o| write_layout_offset(o, None)), "");
        assert_eq!(render(|o| write_flag(o, "static", false)), "");
        assert_eq!(render(|o| write_cv_qualifiers(o, CvQualifiers::empty())), "");
        assert_eq!(
            render(|o| write_location(o, &LocationManager::new(), Location::NONE)),
            ""
        );
    }

    #[test]
    fn test_present_values() {
        assert_eq!(
            render(|o| write_visibility(o, Visibility::Hidden)),
            " visibility='hidden'"
        );
        assert_eq!(render(|o| write_binding(o, Binding::Weak)), " binding='weak'");
        assert_eq!(
            render(|o| write_size_and_alignment(o, 64, 0)),
            " size-in-bits='64'"
        );
        assert_eq!(
            render(|o| write_layout_offset(o, Some(0))),
            " layout-offset-in-bits='0'"
        );
        assert_eq!(
            render(|o| write_access(o, AccessSpecifier::default())),
            " access='private'"
        );
        assert_eq!(
            render(|o| write_cv_qualifiers(o, CvQualifiers::CONST | CvQualifiers::VOLATILE)),
            " const='yes' volatile='yes'"
        );
    }

    #[test]
    fn test_location_expands_through_manager() {
        let mut locations = LocationManager::new();
        let location = locations.create_new_location("include/a.h", 12, 3);

        assert_eq!(
            render(|o| write_location(o, &locations, location)),
            " filepath='include/a.h' line='12' column='3'"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        assert_eq!(
            render(|o| write_attr(o, "name", "operator<")),
            " name='operator&lt;'"
        );
        assert_eq!(
            render(|o| write_attr(o, "name", "it's")),
            " name='it&apos;s'"
        );
    }
}
