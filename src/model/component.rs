//! model::component
//!
//! Typed views over arena nodes.
//!
//! Each handle is a copyable [`ComponentId`] tagged with its variant at the
//! type level. Handles own nothing: getters read through a [`Document`],
//! setters go through an open transaction on one.
//!
//! # Example
//!
//! ```
//! use gwtmodule::engine::Document;
//!
//! let mut doc = Document::from_xml(r#"<module><inherits name="a.B"/></module>"#).unwrap();
//! let module = doc.module().unwrap();
//!
//! doc.transact(|doc| {
//!     let inherits = doc.factory()?.create_inherits()?;
//!     inherits.set_name(doc, Some("c.D"))?;
//!     module.add_component(doc, inherits)
//! })
//! .unwrap();
//!
//! assert_eq!(module.components(&doc).len(), 2);
//! ```

use crate::core::schema::{attr, Variant};
use crate::core::types::ComponentId;
use crate::engine::{Document, TransactionError};
use crate::store::BackingStore;

/// A typed handle onto one component.
pub trait Component: Copy {
    /// The variant every handle of this type wraps.
    const VARIANT: Variant;

    /// Wrap `id` without checking its variant.
    fn wrap(id: ComponentId) -> Self;
}

macro_rules! component_handle {
    ($(#[$doc:meta])* $name:ident => $variant:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(ComponentId);

        impl $name {
            /// The underlying component id.
            pub fn id(&self) -> ComponentId {
                self.0
            }
        }

        impl Component for $name {
            const VARIANT: Variant = Variant::$variant;

            fn wrap(id: ComponentId) -> Self {
                Self(id)
            }
        }
    };
}

macro_rules! string_attribute {
    ($get:ident, $set:ident, $attr:expr) => {
        #[doc = concat!("The raw `", stringify!($get), "` attribute, absent when unset.")]
        pub fn $get<'d, S: BackingStore>(&self, doc: &'d Document<S>) -> Option<&'d str> {
            doc.read_attribute(self.0, $attr)
        }

        #[doc = concat!("Write (`Some`) or remove (`None`) the `", stringify!($get), "` attribute.")]
        pub fn $set<S: BackingStore>(
            &self,
            doc: &mut Document<S>,
            value: Option<&str>,
        ) -> Result<(), TransactionError> {
            doc.write_attribute(self.0, $attr, value)
        }
    };
}

component_handle!(
    /// The `<module>` root.
    Module => Module
);
component_handle!(
    /// `<inherits name=".."/>`
    Inherits => Inherits
);
component_handle!(
    /// `<source>` with its include/exclude filters.
    Source => Source
);
component_handle!(
    /// `<set-configuration-property name=".." value=".."/>`
    SetConfigurationProperty => SetConfigurationProperty
);
component_handle!(
    /// `<set-property name=".." value=".."/>`
    SetProperty => SetProperty
);
component_handle!(
    /// `<stylesheet src=".."/>`
    StyleSheet => StyleSheet
);
component_handle!(
    /// `<include name=".."/>` inside a source.
    Include => Include
);
component_handle!(
    /// `<exclude name=".."/>` inside a source.
    Exclude => Exclude
);

/// Anything that can sit directly under `<module>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleComponent {
    Inherits(Inherits),
    Source(Source),
    SetConfigurationProperty(SetConfigurationProperty),
    SetProperty(SetProperty),
    StyleSheet(StyleSheet),
}

impl ModuleComponent {
    /// Re-type a raw id known to have `variant`.
    pub fn from_variant(variant: Variant, id: ComponentId) -> Option<Self> {
        Some(match variant {
            Variant::Inherits => Self::Inherits(Inherits(id)),
            Variant::Source => Self::Source(Source(id)),
            Variant::SetConfigurationProperty => {
                Self::SetConfigurationProperty(SetConfigurationProperty(id))
            }
            Variant::SetProperty => Self::SetProperty(SetProperty(id)),
            Variant::StyleSheet => Self::StyleSheet(StyleSheet(id)),
            _ => return None,
        })
    }

    /// The id of whichever component this is.
    pub fn id(&self) -> ComponentId {
        match self {
            Self::Inherits(c) => c.id(),
            Self::Source(c) => c.id(),
            Self::SetConfigurationProperty(c) => c.id(),
            Self::SetProperty(c) => c.id(),
            Self::StyleSheet(c) => c.id(),
        }
    }

    /// The variant matching the enum arm.
    pub fn variant(&self) -> Variant {
        match self {
            Self::Inherits(_) => Variant::Inherits,
            Self::Source(_) => Variant::Source,
            Self::SetConfigurationProperty(_) => Variant::SetConfigurationProperty,
            Self::SetProperty(_) => Variant::SetProperty,
            Self::StyleSheet(_) => Variant::StyleSheet,
        }
    }
}

/// Anything that can sit directly under `<source>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterComponent {
    Include(Include),
    Exclude(Exclude),
}

impl FilterComponent {
    /// Re-type a raw id known to have `variant`.
    pub fn from_variant(variant: Variant, id: ComponentId) -> Option<Self> {
        match variant {
            Variant::Include => Some(Self::Include(Include(id))),
            Variant::Exclude => Some(Self::Exclude(Exclude(id))),
            _ => None,
        }
    }

    /// The id of whichever filter this is.
    pub fn id(&self) -> ComponentId {
        match self {
            Self::Include(c) => c.id(),
            Self::Exclude(c) => c.id(),
        }
    }

    /// [`Variant::Include`] or [`Variant::Exclude`].
    pub fn variant(&self) -> Variant {
        match self {
            Self::Include(_) => Variant::Include,
            Self::Exclude(_) => Variant::Exclude,
        }
    }

    /// The `name` pattern of either filter kind.
    pub fn name<'d, S: BackingStore>(&self, doc: &'d Document<S>) -> Option<&'d str> {
        doc.read_attribute(self.id(), attr::NAME)
    }
}

macro_rules! into_union {
    ($union:ident: $($variant:ident),+) => {
        $(
            impl From<$variant> for $union {
                fn from(c: $variant) -> Self {
                    $union::$variant(c)
                }
            }
        )+
    };
}

into_union!(ModuleComponent: Inherits, Source, SetConfigurationProperty, SetProperty, StyleSheet);
into_union!(FilterComponent: Include, Exclude);

impl Module {
    /// Attached children, in document order.
    pub fn components<S: BackingStore>(&self, doc: &Document<S>) -> Vec<ModuleComponent> {
        doc.attached_children(self.0)
            .filter_map(|(variant, id)| ModuleComponent::from_variant(variant, id))
            .collect()
    }

    /// Attached `<source>` children, in document order.
    pub fn sources<S: BackingStore>(&self, doc: &Document<S>) -> Vec<Source> {
        self.components(doc)
            .into_iter()
            .filter_map(|c| match c {
                ModuleComponent::Source(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Attached `<inherits>` children, in document order.
    pub fn inherits<S: BackingStore>(&self, doc: &Document<S>) -> Vec<Inherits> {
        self.components(doc)
            .into_iter()
            .filter_map(|c| match c {
                ModuleComponent::Inherits(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Append a detached component at the end.
    pub fn add_component<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        component: impl Into<ModuleComponent>,
    ) -> Result<(), TransactionError> {
        doc.attach_child(self.0, component.into().id(), None)
    }

    /// Insert a detached component at `index` of the component list.
    pub fn insert_component<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        index: usize,
        component: impl Into<ModuleComponent>,
    ) -> Result<(), TransactionError> {
        doc.attach_child(self.0, component.into().id(), Some(index))
    }

    /// Remove a component. Its backing element is detached, not destroyed.
    pub fn remove_component<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        component: impl Into<ModuleComponent>,
    ) -> Result<(), TransactionError> {
        doc.detach_child(self.0, component.into().id())
    }
}

impl Source {
    string_attribute!(path, set_path, attr::PATH);
    string_attribute!(excludes, set_excludes, attr::EXCLUDES);
    string_attribute!(includes, set_includes, attr::INCLUDES);

    /// `true` unless `defaultExcludes` is exactly `"no"`.
    pub fn is_default_excludes<S: BackingStore>(&self, doc: &Document<S>) -> bool {
        doc.read_attribute(self.0, attr::DEFAULT_EXCLUDES) != Some("no")
    }

    /// Writes `"yes"` or `"no"`.
    pub fn set_default_excludes<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        value: bool,
    ) -> Result<(), TransactionError> {
        let raw = if value { "yes" } else { "no" };
        doc.write_attribute(self.0, attr::DEFAULT_EXCLUDES, Some(raw))
    }

    /// `true` unless `casesensitive` is exactly `"false"`.
    pub fn is_casesensitive<S: BackingStore>(&self, doc: &Document<S>) -> bool {
        doc.read_attribute(self.0, attr::CASE_SENSITIVE) != Some("false")
    }

    /// Writes `"true"` or `"false"`.
    pub fn set_casesensitive<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        value: bool,
    ) -> Result<(), TransactionError> {
        let raw = if value { "true" } else { "false" };
        doc.write_attribute(self.0, attr::CASE_SENSITIVE, Some(raw))
    }

    /// Attached filters, in document order.
    pub fn filters<S: BackingStore>(&self, doc: &Document<S>) -> Vec<FilterComponent> {
        doc.attached_children(self.0)
            .filter_map(|(variant, id)| FilterComponent::from_variant(variant, id))
            .collect()
    }

    /// Append a detached filter at the end.
    pub fn add_filter<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        filter: impl Into<FilterComponent>,
    ) -> Result<(), TransactionError> {
        doc.attach_child(self.0, filter.into().id(), None)
    }

    /// Insert a detached filter at `index` of the filter list.
    pub fn insert_filter<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        index: usize,
        filter: impl Into<FilterComponent>,
    ) -> Result<(), TransactionError> {
        doc.attach_child(self.0, filter.into().id(), Some(index))
    }

    /// Remove a filter. Its backing element is detached, not destroyed.
    pub fn remove_filter<S: BackingStore>(
        &self,
        doc: &mut Document<S>,
        filter: impl Into<FilterComponent>,
    ) -> Result<(), TransactionError> {
        doc.detach_child(self.0, filter.into().id())
    }
}

impl Inherits {
    string_attribute!(name, set_name, attr::NAME);
}

impl SetConfigurationProperty {
    string_attribute!(name, set_name, attr::NAME);
    string_attribute!(value, set_value, attr::VALUE);
}

impl SetProperty {
    string_attribute!(name, set_name, attr::NAME);
    string_attribute!(value, set_value, attr::VALUE);
}

impl StyleSheet {
    string_attribute!(src, set_src, attr::SRC);
}

impl Include {
    string_attribute!(name, set_name, attr::NAME);
}

impl Exclude {
    string_attribute!(name, set_name, attr::NAME);
}
