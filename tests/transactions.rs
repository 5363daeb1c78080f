//! Typed mutation through transactions.

mod common;

use common::{load, variants, FIVE_COMPONENTS, SIX_COMPONENTS};
use gwtmodule::core::ops::{StepKind, TxPhase};
use gwtmodule::core::schema::Variant;
use gwtmodule::{BackingStore, FilterComponent, ModuleComponent, TransactionError};

#[test]
fn programmatic_insertion_appends_elements() {
    let mut doc = load(SIX_COMPONENTS);
    let module = doc.module().unwrap();

    doc.transact(|doc| {
        let source = doc.factory()?.create_source()?;
        source.set_path(doc, Some("generated"))?;
        module.add_component(doc, source)?;

        let inherits = doc.factory()?.create_inherits()?;
        inherits.set_name(doc, Some("com.example.Extra"))?;
        module.add_component(doc, inherits)?;

        let property = doc.factory()?.create_set_property()?;
        property.set_name(doc, Some("locale"))?;
        property.set_value(doc, Some("en"))?;
        module.add_component(doc, property)?;

        let config = doc.factory()?.create_set_configuration_property()?;
        config.set_name(doc, Some("compiler.stackMode"))?;
        config.set_value(doc, Some("strip"))?;
        module.add_component(doc, config)?;

        let style = doc.factory()?.create_style_sheet()?;
        style.set_src(doc, Some("extra.css"))?;
        module.add_component(doc, style)
    })
    .unwrap();

    let components = module.components(&doc);
    assert_eq!(components.len(), 11);
    assert_eq!(
        variants(&components[6..]),
        vec![
            Variant::Source,
            Variant::Inherits,
            Variant::SetProperty,
            Variant::SetConfigurationProperty,
            Variant::StyleSheet,
        ]
    );

    let store = doc.store();
    let root = store.root().unwrap();
    let children = store.children(root);
    let tail: Vec<_> = children[children.len() - 5..]
        .iter()
        .map(|e| store.tag_name(*e).unwrap())
        .collect();
    assert_eq!(
        tail,
        vec!["source", "inherits", "set-property", "set-configuration-property", "stylesheet"]
    );
    let property = children[children.len() - 3];
    assert_eq!(store.attribute(property, "name"), Some("locale"));
    assert_eq!(store.attribute(property, "value"), Some("en"));
    assert_eq!(store.attribute(children[children.len() - 5], "path"), Some("generated"));
    assert!(doc.verify().is_ok());
}

#[test]
fn adding_a_filter_creates_one_child_element() {
    let mut doc = load(FIVE_COMPONENTS);
    let source = doc.module().unwrap().sources(&doc)[0];
    let source_element = doc.element(source.id()).unwrap();
    let before = doc.store().children(source_element);

    doc.transact(|doc| {
        let exclude = doc.factory()?.create_exclude()?;
        exclude.set_name(doc, Some("**/gen/**"))?;
        source.add_filter(doc, exclude)
    })
    .unwrap();

    let after = doc.store().children(source_element);
    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(&after[..before.len()], before.as_slice());
    let added = *after.last().unwrap();
    assert_eq!(doc.store().tag_name(added), Some("exclude"));
    assert_eq!(doc.store().attribute(added, "name"), Some("**/gen/**"));

    let filters = source.filters(&doc);
    assert_eq!(filters.len(), 3);
    assert!(matches!(filters[2], FilterComponent::Exclude(_)));
}

#[test]
fn explicit_index_places_component() {
    let mut doc = load(FIVE_COMPONENTS);
    let module = doc.module().unwrap();
    let before = module.components(&doc);

    let inherits = doc
        .transact(|doc| {
            let inherits = doc.factory()?.create_inherits()?;
            inherits.set_name(doc, Some("first"))?;
            module.insert_component(doc, 0, inherits)?;
            Ok::<_, TransactionError>(inherits)
        })
        .unwrap();

    let after = module.components(&doc);
    assert_eq!(after[0], ModuleComponent::Inherits(inherits));
    assert_eq!(&after[1..], before.as_slice());
    assert!(doc.to_xml().starts_with("<module>\n  <inherits name=\"first\"/>"));
}

#[test]
fn insertion_order_follows_call_order() {
    let mut doc = load("<module/>");
    let module = doc.module().unwrap();

    doc.transact(|doc| {
        for name in ["a", "b", "c"] {
            let inherits = doc.factory()?.create_inherits()?;
            inherits.set_name(doc, Some(name))?;
            module.add_component(doc, inherits)?;
        }
        Ok::<_, TransactionError>(())
    })
    .unwrap();

    let names: Vec<_> = module
        .inherits(&doc)
        .iter()
        .map(|i| i.name(&doc).unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn source_built_detached_then_attached() {
    let mut doc = load("<module/>");
    let module = doc.module().unwrap();

    let source = doc
        .transact(|doc| {
            let source = doc.factory()?.create_source()?;
            let include = doc.factory()?.create_include()?;
            include.set_name(doc, Some("**"))?;
            source.add_filter(doc, include)?;
            assert!(!doc.is_attached(include.id()));
            assert!(source.filters(doc).is_empty());
            module.add_component(doc, source)?;
            Ok::<_, TransactionError>(source)
        })
        .unwrap();

    assert_eq!(source.filters(&doc).len(), 1);
    assert!(doc.is_attached(source.filters(&doc)[0].id()));
    insta::assert_snapshot!(doc.to_xml(), @r#"
    <module>
      <source>
        <include name="**"/>
      </source>
    </module>
    "#);
}

#[test]
fn removed_component_is_detached_but_usable() {
    let mut doc = load(FIVE_COMPONENTS);
    let module = doc.module().unwrap();
    let stylesheet = match module.components(&doc)[4] {
        ModuleComponent::StyleSheet(s) => s,
        other => panic!("unexpected {other:?}"),
    };

    doc.transact(|doc| module.remove_component(doc, stylesheet))
        .unwrap();

    assert_eq!(module.components(&doc).len(), 4);
    assert!(!doc.is_attached(stylesheet.id()));
    assert_eq!(stylesheet.src(&doc), Some("main.css"));
    assert!(!doc.to_xml().contains("stylesheet"));
    let journal = doc.last_journal().unwrap();
    assert!(matches!(journal.steps[0].kind, StepKind::RemoveChild { .. }));
}

#[test]
fn removing_a_non_child_fails() {
    let mut doc = load(FIVE_COMPONENTS);
    let module = doc.module().unwrap();

    let err = doc
        .transact(|doc| {
            let orphan = doc.factory()?.create_inherits()?;
            module.remove_component(doc, orphan)
        })
        .unwrap_err();
    assert!(matches!(err, TransactionError::NotAChild { .. }));
}

#[test]
fn error_inside_transact_rolls_back() {
    let mut doc = load(FIVE_COMPONENTS);
    let module = doc.module().unwrap();
    let before = doc.to_xml();
    let inherits = module.inherits(&doc)[0];

    let result: Result<(), TransactionError> = doc.transact(|doc| {
        inherits.set_name(doc, Some("changed"))?;
        let source = doc.factory()?.create_source()?;
        module.add_component(doc, source)?;
        Err(TransactionError::NotOpen)
    });

    assert!(result.is_err());
    assert_eq!(doc.to_xml(), before);
    assert_eq!(inherits.name(&doc), Some("com.example.Core"));
    assert_eq!(module.components(&doc).len(), 5);
    assert!(!doc.is_transaction_open());
    assert!(!doc.store().is_write_locked());
    assert_eq!(doc.last_journal().unwrap().phase, TxPhase::RolledBack);
}

#[test]
fn dropped_guard_releases_lock() {
    let mut doc = load(FIVE_COMPONENTS);
    let inherits = doc.module().unwrap().inherits(&doc)[0];
    {
        let mut tx = doc.transaction().unwrap();
        inherits.set_name(&mut tx, Some("temporary")).unwrap();
        assert_eq!(inherits.name(&tx), Some("temporary"));
    }
    assert!(!doc.store().is_write_locked());
    assert_eq!(inherits.name(&doc), Some("com.example.Core"));

    // The document is usable again.
    doc.transact(|doc| inherits.set_name(doc, Some("kept"))).unwrap();
    assert_eq!(inherits.name(&doc), Some("kept"));
}

#[test]
fn panic_inside_transact_releases_lock() {
    let mut doc = load(FIVE_COMPONENTS);
    let inherits = doc.module().unwrap().inherits(&doc)[0];

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = doc.transact(|doc| -> Result<(), TransactionError> {
            inherits.set_name(doc, Some("boom"))?;
            panic!("failure inside transaction")
        });
    }));

    assert!(outcome.is_err());
    assert!(!doc.is_transaction_open());
    assert!(!doc.store().is_write_locked());
    assert_eq!(inherits.name(&doc), Some("com.example.Core"));
}

#[test]
fn attribute_removal_is_journaled() {
    let mut doc = load(FIVE_COMPONENTS);
    let source = doc.module().unwrap().sources(&doc)[0];

    doc.transact(|doc| {
        source.set_path(doc, None)?;
        source.set_includes(doc, Some("**/*.java"))
    })
    .unwrap();

    assert_eq!(source.path(&doc), None);
    assert_eq!(source.includes(&doc), Some("**/*.java"));
    let steps: Vec<_> = doc
        .last_journal()
        .unwrap()
        .steps
        .iter()
        .map(|s| s.kind.clone())
        .collect();
    assert!(matches!(
        &steps[0],
        StepKind::SetAttribute { old: Some(old), new: None, .. } if old == "client"
    ));
}

#[test]
fn wrapping_a_loaded_element_keeps_its_component() {
    let mut doc = load("<module><inherits name=\"a.B\"/><stylesheet src=\"a.css\"/></module>");
    let module = doc.module().unwrap();
    let before = module.components(&doc);
    let inherits = before[0].id();
    let element = doc.element(inherits).unwrap();

    let wrapped = doc
        .transact(|doc| -> Result<_, TransactionError> {
            let wrapped = doc.factory()?.create_component(Some(module.id()), element);
            assert_eq!(module.components(doc).len(), 2);
            Ok(wrapped)
        })
        .unwrap();

    assert_eq!(wrapped, Some(inherits));
    assert_eq!(module.components(&doc), before);
    assert_eq!(doc.parent(inherits), Some(module.id()));
    assert!(doc.is_attached(inherits));
    assert!(doc.verify().is_ok());
}

#[test]
fn guard_committed_through_the_document_is_not_rolled_back() {
    let mut doc = load(FIVE_COMPONENTS);
    let inherits = doc.module().unwrap().inherits(&doc)[0];
    {
        let mut tx = doc.transaction().unwrap();
        inherits.set_name(&mut tx, Some("committed")).unwrap();
        tx.end_transaction().unwrap();
    }

    assert_eq!(inherits.name(&doc), Some("committed"));
    assert!(!doc.is_transaction_open());
    assert!(!doc.store().is_write_locked());
    assert_eq!(doc.last_journal().unwrap().phase, TxPhase::Committed);
}
