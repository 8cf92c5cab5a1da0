//! Factory for the headless widget set.

use super::native_tree::{NativeTree, WidgetKind};
use super::widget::HeadlessWidget;
use crate::engine::{TypeFactory, UiObject};

/// Alternate discriminants accepted for the same widgets.
pub const ALIASES: [(&str, WidgetKind); 3] = [
    ("Container", WidgetKind::View),
    ("Label", WidgetKind::Text),
    ("Input", WidgetKind::TextInput),
];

/// A [`TypeFactory`] building every [`WidgetKind`] into `tree`.
pub fn headless_factory(tree: &NativeTree) -> TypeFactory {
    let mut factory = TypeFactory::new();
    for kind in WidgetKind::ALL {
        let tree = tree.clone();
        factory.register(kind.type_name(), move |_| {
            Box::new(HeadlessWidget::new(&tree, kind)) as Box<dyn UiObject>
        });
    }
    for (alias, kind) in ALIASES {
        factory.alias(alias, kind.type_name());
    }
    factory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::UiFactory;
    use serde_json::json;

    #[test]
    fn test_every_kind_and_alias_builds() {
        let tree = NativeTree::new();
        let factory = headless_factory(&tree);

        for kind in WidgetKind::ALL {
            let attrs = json!({ "id": "x", "type": kind.type_name() });
            let object = factory.create(attrs.as_object().unwrap()).unwrap();
            assert_eq!(tree.kind(object.native_handle()), Some(kind));
        }

        let attrs = json!({ "id": "x", "type": "Label" });
        let object = factory.create(attrs.as_object().unwrap()).unwrap();
        assert_eq!(tree.kind(object.native_handle()), Some(WidgetKind::Text));
        assert_eq!(factory.type_names().len(), WidgetKind::ALL.len() + ALIASES.len());
    }
}
