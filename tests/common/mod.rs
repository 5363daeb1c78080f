//! Shared fixtures for integration tests.

#![allow(dead_code)]

use gwtmodule::core::schema::Variant;
use gwtmodule::{Document, DomStore, ModuleComponent};

/// One of everything under `<module>`, with a second source holding two
/// filters.
pub const SIX_COMPONENTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<module>
  <inherits name="com.google.gwt.user.User"/>
  <source path="client"/>
  <source path="shared" defaultExcludes="no" casesensitive="false">
    <include name="**/*.java"/>
    <exclude name="**/*Test.java"/>
  </source>
  <set-configuration-property name="locale.cookie" value="LOCALE"/>
  <set-property name="user.agent" value="safari"/>
  <stylesheet src="app.css"/>
</module>
"#;

/// Five top-level components; the source holds two filters.
pub const FIVE_COMPONENTS: &str = r#"<module>
  <inherits name="com.example.Core"/>
  <source path="client">
    <include name="**/*.java"/>
    <exclude name="**/Test*.java"/>
  </source>
  <set-configuration-property name="document.compatMode" value="CSS1Compat"/>
  <set-property name="user.agent" value="gecko1_8"/>
  <stylesheet src="main.css"/>
</module>
"#;

pub fn load(text: &str) -> Document<DomStore> {
    Document::from_xml(text).unwrap()
}

pub fn variants(components: &[ModuleComponent]) -> Vec<Variant> {
    components.iter().map(|c| c.variant()).collect()
}
