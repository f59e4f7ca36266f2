//! List nodes that can be mixed into the example schema.

use indexmap::IndexMap;
use serde_json::Value;

use folio_model::NodeSpec;

use crate::schema_basic::attr_default;

/// Add an ordered list, bullet list, and list item to the given node
/// specs. `item_content` is the content expression of the list items, and
/// `list_group` the group the list nodes are added to.
pub fn add_list_nodes(
    mut nodes: IndexMap<String, NodeSpec>,
    item_content: &str,
    list_group: &str,
) -> IndexMap<String, NodeSpec> {
    nodes.insert(
        "ordered_list".to_owned(),
        NodeSpec {
            attrs: IndexMap::from([("order".to_owned(), attr_default(Value::from(1)))]),
            content: Some("list_item+".to_owned()),
            group: Some(list_group.to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "bullet_list".to_owned(),
        NodeSpec {
            content: Some("list_item+".to_owned()),
            group: Some(list_group.to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "list_item".to_owned(),
        NodeSpec {
            content: Some(item_content.to_owned()),
            defining: true,
            ..NodeSpec::default()
        },
    );
    nodes
}
