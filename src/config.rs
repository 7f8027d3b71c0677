/// Output configuration shared by every writer entry point.
///
/// The version is stamped on the root element as `version='MAJOR.MINOR'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConfig {
    format_major_version: u8,
    format_minor_version: u8,
    xml_element_indent: usize,
}

impl Default for WriteConfig {
    fn default() -> Self {
        WriteConfig {
            format_major_version: 1,
            format_minor_version: 0,
            xml_element_indent: 2,
        }
    }
}

impl WriteConfig {
    pub fn new() -> Self {
        WriteConfig::default()
    }

    pub fn format_version(mut self, major: u8, minor: u8) -> Self {
        self.format_major_version = major;
        self.format_minor_version = minor;
        self
    }

    /// Number of spaces each nesting level adds.
    pub fn xml_element_indent(mut self, indent: usize) -> Self {
        self.xml_element_indent = indent;
        self
    }

    pub fn get_format_major_version(&self) -> u8 {
        self.format_major_version
    }

    pub fn get_format_minor_version(&self) -> u8 {
        self.format_minor_version
    }

    pub fn get_xml_element_indent(&self) -> usize {
        self.xml_element_indent
    }
}
