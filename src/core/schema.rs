//! core::schema
//!
//! The closed vocabulary of a module descriptor.
//!
//! # Overview
//!
//! ```text
//! <module>
//!   <inherits name=".."/>
//!   <source path=".." excludes=".." includes=".." defaultExcludes="yes|no" casesensitive="true|false">
//!     <include name=".."/>
//!     <exclude name=".."/>
//!   </source>
//!   <set-configuration-property name=".." value=".."/>
//!   <set-property name=".." value=".."/>
//!   <stylesheet src=".."/>
//! </module>
//! ```
//!
//! The resolution table below is the only place that decides which raw
//! elements take part in the typed model. Both initial construction and
//! reconciliation consult it; anything it rejects is invisible.

use serde::{Deserialize, Serialize};

/// The concrete kind of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    Module,
    Inherits,
    Source,
    SetConfigurationProperty,
    SetProperty,
    StyleSheet,
    Include,
    Exclude,
}

/// Which ordered child list a container keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// `Module` children: inherits, source, set-configuration-property,
    /// set-property, stylesheet.
    ModuleComponents,
    /// `Source` children: include, exclude.
    Filters,
}

impl Variant {
    /// Every variant, in declaration order.
    pub const ALL: [Variant; 8] = [
        Variant::Module,
        Variant::Inherits,
        Variant::Source,
        Variant::SetConfigurationProperty,
        Variant::SetProperty,
        Variant::StyleSheet,
        Variant::Include,
        Variant::Exclude,
    ];

    /// Canonical element tag for this variant.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Variant::Module => "module",
            Variant::Inherits => "inherits",
            Variant::Source => "source",
            Variant::SetConfigurationProperty => "set-configuration-property",
            Variant::SetProperty => "set-property",
            Variant::StyleSheet => "stylesheet",
            Variant::Include => "include",
            Variant::Exclude => "exclude",
        }
    }

    /// The child list this variant hosts, if it is a container.
    pub fn hosted_list(&self) -> Option<ListKind> {
        match self {
            Variant::Module => Some(ListKind::ModuleComponents),
            Variant::Source => Some(ListKind::Filters),
            _ => None,
        }
    }

    /// The child list this variant lives in, if it can be a child at all.
    pub fn member_of(&self) -> Option<ListKind> {
        match self {
            Variant::Module => None,
            Variant::Include | Variant::Exclude => Some(ListKind::Filters),
            _ => Some(ListKind::ModuleComponents),
        }
    }

    /// Attributes declared for this variant.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Variant::Module => &[],
            Variant::Source => &[
                attr::PATH,
                attr::EXCLUDES,
                attr::INCLUDES,
                attr::DEFAULT_EXCLUDES,
                attr::CASE_SENSITIVE,
            ],
            Variant::SetConfigurationProperty | Variant::SetProperty => &[attr::NAME, attr::VALUE],
            Variant::StyleSheet => &[attr::SRC],
            Variant::Inherits | Variant::Include | Variant::Exclude => &[attr::NAME],
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Attribute names, exactly as they appear in documents.
pub mod attr {
    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";
    pub const PATH: &str = "path";
    pub const EXCLUDES: &str = "excludes";
    pub const INCLUDES: &str = "includes";
    pub const DEFAULT_EXCLUDES: &str = "defaultExcludes";
    pub const CASE_SENSITIVE: &str = "casesensitive";
    pub const SRC: &str = "src";
}

/// One row of the resolution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub parent: Option<Variant>,
    pub tag: &'static str,
    pub child: Variant,
}

const MODULE_RULES: &[Rule] = &[
    Rule { parent: None, tag: "module", child: Variant::Module },
    Rule { parent: Some(Variant::Module), tag: "inherits", child: Variant::Inherits },
    Rule { parent: Some(Variant::Module), tag: "source", child: Variant::Source },
    Rule {
        parent: Some(Variant::Module),
        tag: "set-configuration-property",
        child: Variant::SetConfigurationProperty,
    },
    Rule { parent: Some(Variant::Module), tag: "set-property", child: Variant::SetProperty },
    Rule { parent: Some(Variant::Module), tag: "stylesheet", child: Variant::StyleSheet },
    Rule { parent: Some(Variant::Source), tag: "include", child: Variant::Include },
    Rule { parent: Some(Variant::Source), tag: "exclude", child: Variant::Exclude },
];

/// An immutable resolution table mapping (parent variant, tag) to a variant.
///
/// The default table is the module descriptor vocabulary. The table is
/// passed around by value; there is no global registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    rules: &'static [Rule],
}

impl Default for Schema {
    fn default() -> Self {
        Self::module()
    }
}

impl Schema {
    /// The module descriptor vocabulary.
    pub const fn module() -> Self {
        Self { rules: MODULE_RULES }
    }

    /// Resolve the variant for `tag` appearing under `parent`.
    ///
    /// `parent = None` means "document root". Returns `None` for anything
    /// outside the vocabulary, which callers treat as "not part of the
    /// model" rather than as an error.
    ///
    /// # Example
    ///
    /// ```
    /// use gwtmodule::core::schema::{Schema, Variant};
    ///
    /// let schema = Schema::module();
    /// assert_eq!(schema.resolve(None, "module"), Some(Variant::Module));
    /// assert_eq!(schema.resolve(Some(Variant::Module), "source"), Some(Variant::Source));
    /// assert_eq!(schema.resolve(Some(Variant::Module), "include"), None);
    /// ```
    pub fn resolve(&self, parent: Option<Variant>, tag: &str) -> Option<Variant> {
        self.rules
            .iter()
            .find(|rule| rule.parent == parent && rule.tag == tag)
            .map(|rule| rule.child)
    }

    /// All rules in table order.
    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }
}

/// Resolve against the module descriptor vocabulary.
pub fn resolve(parent: Option<Variant>, tag: &str) -> Option<Variant> {
    Schema::module().resolve(parent, tag)
}
