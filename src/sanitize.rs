//! Circular-Reference Sanitizer: `$ref` expansion with cycle cutting.
//!
//! This is the pipeline's core algorithmic component. The parser guarantees
//! every `$ref` target exists, but a dereferenced OpenAPI document is a
//! graph, not a tree: a schema may reference itself through its own
//! descendants. A [`serde_json::Value`] cannot represent that graph, so
//! this walk performs the dereferencing itself and cuts every back-edge as
//! it goes, producing a tree that serializes without loss of any non-cyclic
//! data.
//!
//! # Algorithm
//!
//! Depth-first expansion with an explicit active-path set of canonical
//! source pointers. Every container node has exactly one canonical
//! pointer: its location in the source document (for nodes reached by the
//! plain walk) or its `$ref` target pointer (for nodes reached through a
//! reference). The pointer names the *identity* of the source node, so
//! two structurally equal but distinct nodes are never confused:
//!
//! 1. On entering a container, its canonical pointer joins the active set;
//!    it leaves the set on exit (DFS discovery/finish coloring).
//! 2. A `$ref` whose target pointer is already active is a back-edge: the
//!    reference is replaced with a [cycle placeholder] carrying the
//!    target's type name and the path at which the cut was made, and the
//!    walk does not recurse into it.
//! 3. Reaching the *same* target twice along two disjoint paths (a
//!    diamond) is therefore correctly not a cycle; both sites receive the
//!    full expansion.
//! 4. A node-visit budget and a depth bound convert pathological `$ref`
//!    fan-out into error placeholders for the affected subtree; the rest
//!    of the document continues processing. One bad subtree never aborts
//!    sanitization of the whole document.
//! 5. Scalar leaves pass through unchanged.
//!
//! Complexity is O(nodes materialized) with O(depth) auxiliary space; the
//! budget bounds materialization on adversarial inputs.
//!
//! [cycle placeholder]: CYCLE_MARKER

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::IngestConfig;
use crate::parse::ref_to_pointer;

/// Marker key identifying a cut back-edge.
///
/// A cycle placeholder is `{"x-circular-ref": true, "originalType": <name>,
/// "pathAtCut": [<segments>]}`.
pub const CYCLE_MARKER: &str = "x-circular-ref";

/// Marker key identifying a subtree replaced after a local traversal
/// failure (budget exhaustion, depth overflow, unresolvable reference).
///
/// An error placeholder is `{"x-sanitizer-error": true, "reason": <string>,
/// "originalType": <name>}`.
pub const ERROR_MARKER: &str = "x-sanitizer-error";

/// Result of a sanitization walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeOutcome {
    /// The fully dereferenced, guaranteed-acyclic document.
    pub document: Value,
    /// Paths at which back-edges were cut, one entry per placeholder.
    pub cycles_cut: Vec<String>,
    /// Number of subtrees replaced with error placeholders.
    pub subtree_errors: usize,
}

/// Expand every `$ref` in `root`, cutting cycles and degrading failed
/// subtrees to placeholders. Never fails; the outcome always contains a
/// serializable tree.
pub fn sanitize(root: &Value, cfg: &IngestConfig) -> SanitizeOutcome {
    let mut walker = Walker {
        root,
        cfg,
        active: Vec::new(),
        visits: 0,
        cycles_cut: Vec::new(),
        subtree_errors: 0,
    };
    let mut path = Vec::new();
    let mut canon = String::new();
    let document = walker.expand(root, &mut path, &mut canon, 0);

    if !walker.cycles_cut.is_empty() || walker.subtree_errors > 0 {
        debug!(
            cycles = walker.cycles_cut.len(),
            errors = walker.subtree_errors,
            "sanitizer_degradations"
        );
    }

    SanitizeOutcome {
        document,
        cycles_cut: walker.cycles_cut,
        subtree_errors: walker.subtree_errors,
    }
}

struct Walker<'a> {
    root: &'a Value,
    cfg: &'a IngestConfig,
    /// Canonical pointers of the container nodes currently being visited on
    /// the path from the root to the current node.
    active: Vec<String>,
    visits: usize,
    cycles_cut: Vec<String>,
    subtree_errors: usize,
}

impl Walker<'_> {
    /// `path` is the output-tree path (display segments, accumulated for
    /// `pathAtCut`); `canon` is the canonical source pointer of `node`.
    fn expand(
        &mut self,
        node: &Value,
        path: &mut Vec<String>,
        canon: &mut String,
        depth: usize,
    ) -> Value {
        self.visits += 1;
        if self.visits > self.cfg.max_node_visits {
            return self.fail("node visit budget exceeded", node);
        }
        if depth > self.cfg.max_depth {
            return self.fail("maximum expansion depth exceeded", node);
        }

        match node {
            Value::Object(map) => {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    return self.expand_ref(map, reference, path, depth);
                }
                self.active.push(canon.clone());
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    path.push(key.clone());
                    let saved = canon.len();
                    canon.push('/');
                    canon.push_str(&escape_pointer_segment(key));
                    let expanded = self.expand(value, path, canon, depth + 1);
                    canon.truncate(saved);
                    path.pop();
                    out.insert(key.clone(), expanded);
                }
                self.active.pop();
                Value::Object(out)
            }
            Value::Array(items) => {
                self.active.push(canon.clone());
                let mut out = Vec::with_capacity(items.len());
                for (index, value) in items.iter().enumerate() {
                    let segment = index.to_string();
                    path.push(segment.clone());
                    let saved = canon.len();
                    canon.push('/');
                    canon.push_str(&segment);
                    out.push(self.expand(value, path, canon, depth + 1));
                    canon.truncate(saved);
                    path.pop();
                }
                self.active.pop();
                Value::Array(out)
            }
            leaf => leaf.clone(),
        }
    }

    fn expand_ref(
        &mut self,
        site: &Map<String, Value>,
        reference: &str,
        path: &mut Vec<String>,
        depth: usize,
    ) -> Value {
        let Some(pointer) = ref_to_pointer(reference) else {
            return self.fail("external $ref not resolvable", &Value::Null);
        };

        if self.active.contains(&pointer) {
            let cut_path = path.join("/");
            debug!(reference, path = %cut_path, "cycle_cut");
            self.cycles_cut.push(cut_path);
            return cycle_placeholder(&pointer, path);
        }

        let Some(target) = self.root.pointer(&pointer) else {
            // The parser checks resolvability, but sanitize() accepts
            // arbitrary trees.
            return self.fail("unresolvable $ref", &Value::Null);
        };

        // The target's canonical identity is its own pointer, not the
        // location of the reference site. Push it here as well as in the
        // container case of `expand`: a target that is itself a bare $ref
        // never reaches that push, and an alias ring would otherwise slip
        // past the back-edge check.
        self.active.push(pointer.clone());
        let mut target_canon = pointer;
        let mut expanded = self.expand(target, path, &mut target_canon, depth + 1);
        self.active.pop();

        // OpenAPI allows `summary`/`description` alongside a $ref; overlay
        // them onto the expansion. Other siblings are ignored.
        if let Value::Object(out) = &mut expanded {
            for key in ["summary", "description"] {
                if let Some(value) = site.get(key) {
                    out.insert(key.to_string(), value.clone());
                }
            }
        }
        expanded
    }

    fn fail(&mut self, reason: &str, node: &Value) -> Value {
        self.subtree_errors += 1;
        let mut map = Map::new();
        map.insert(ERROR_MARKER.to_string(), Value::Bool(true));
        map.insert("reason".to_string(), Value::String(reason.to_string()));
        map.insert(
            "originalType".to_string(),
            Value::String(json_type_name(node).to_string()),
        );
        Value::Object(map)
    }
}

fn cycle_placeholder(pointer: &str, path: &[String]) -> Value {
    let mut map = Map::new();
    map.insert(CYCLE_MARKER.to_string(), Value::Bool(true));
    map.insert(
        "originalType".to_string(),
        Value::String(pointer_type_name(pointer)),
    );
    map.insert(
        "pathAtCut".to_string(),
        Value::Array(path.iter().cloned().map(Value::String).collect()),
    );
    Value::Object(map)
}

fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Human-readable name of a reference target: the final pointer segment
/// with JSON-pointer escapes undone (`#/components/schemas/Pet` → `Pet`).
fn pointer_type_name(pointer: &str) -> String {
    pointer
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .unwrap_or_else(|| "document".to_string())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true if `value` is a placeholder inserted by the sanitizer.
pub fn is_placeholder(value: &Value) -> bool {
    value.get(CYCLE_MARKER).is_some() || value.get(ERROR_MARKER).is_some()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cfg() -> IngestConfig {
        IngestConfig::default()
    }

    fn count_markers(value: &Value, marker: &str) -> usize {
        match value {
            Value::Object(map) => {
                let own = usize::from(map.contains_key(marker));
                own + map.values().map(|v| count_markers(v, marker)).sum::<usize>()
            }
            Value::Array(items) => items.iter().map(|v| count_markers(v, marker)).sum(),
            _ => 0,
        }
    }

    #[test]
    fn acyclic_document_is_unchanged() {
        let doc = json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "paths": {"/pets": {"get": {"responses": {"200": {"description": "ok"}}}}}
        });
        let outcome = sanitize(&doc, &cfg());
        assert_eq!(outcome.document, doc);
        assert!(outcome.cycles_cut.is_empty());
        assert_eq!(outcome.subtree_errors, 0);
    }

    #[test]
    fn sanitization_is_idempotent() {
        let doc = json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "paths": {},
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                }
            }}
        });
        let first = sanitize(&doc, &cfg());
        let second = sanitize(&first.document, &cfg());
        assert_eq!(second.document, first.document);
        assert!(second.cycles_cut.is_empty());
        assert_eq!(second.subtree_errors, 0);
    }

    #[test]
    fn self_reference_is_cut_at_first_reentry() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                }
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        assert_eq!(outcome.cycles_cut.len(), 1);

        // The schema is its own ancestor, so the cut lands directly at the
        // referencing property.
        let placeholder = &outcome.document["components"]["schemas"]["Node"]["properties"]["next"];
        assert_eq!(placeholder[CYCLE_MARKER], true);
        assert_eq!(placeholder["originalType"], "Node");
        let path = placeholder["pathAtCut"].as_array().expect("path array");
        assert!(!path.is_empty(), "pathAtCut must be non-empty");
        assert_eq!(
            path.iter().map(|v| v.as_str().unwrap()).collect::<Vec<_>>(),
            ["components", "schemas", "Node", "properties", "next"]
        );
    }

    #[test]
    fn three_hop_cycle_terminates_with_one_cut_per_entry() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "A": {"type": "object", "properties": {"b": {"$ref": "#/components/schemas/B"}}},
                "B": {"type": "object", "properties": {"c": {"$ref": "#/components/schemas/C"}}},
                "C": {"type": "object", "properties": {"a": {"$ref": "#/components/schemas/A"}}}
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        // Expanding A, B, and C each walks the ring until it re-enters its
        // own start: one cut per component entry.
        assert_eq!(count_markers(&outcome.document, CYCLE_MARKER), 3);
        assert_eq!(outcome.cycles_cut.len(), 3);
        assert!(outcome.cycles_cut.iter().all(|p| !p.is_empty()));

        // A's ring is fully expanded up to the back-edge.
        let cut = &outcome.document["components"]["schemas"]["A"]["properties"]["b"]
            ["properties"]["c"]["properties"]["a"];
        assert_eq!(cut[CYCLE_MARKER], true);
        assert_eq!(cut["originalType"], "A");
    }

    #[test]
    fn direct_self_alias_is_cut_as_a_cycle() {
        // A schema whose entire body is a $ref to itself: no container is
        // ever entered between re-entries, so the back-edge must be caught
        // on the reference pointer alone.
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "A": {"$ref": "#/components/schemas/A"}
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        assert_eq!(outcome.cycles_cut.len(), 1);
        assert_eq!(outcome.subtree_errors, 0);

        let placeholder = &outcome.document["components"]["schemas"]["A"];
        assert_eq!(placeholder[CYCLE_MARKER], true);
        assert_eq!(placeholder["originalType"], "A");
    }

    #[test]
    fn two_hop_alias_ring_is_cut_as_cycles() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "A": {"$ref": "#/components/schemas/B"},
                "B": {"$ref": "#/components/schemas/A"}
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        assert_eq!(outcome.cycles_cut.len(), 2);
        assert_eq!(outcome.subtree_errors, 0);
        assert_eq!(count_markers(&outcome.document, CYCLE_MARKER), 2);
        assert_eq!(count_markers(&outcome.document, ERROR_MARKER), 0);
    }

    #[test]
    fn diamond_reuse_is_preserved() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "Shared": {"type": "string", "format": "uuid"},
                "Left": {"type": "object", "properties": {"id": {"$ref": "#/components/schemas/Shared"}}},
                "Right": {"type": "object", "properties": {"id": {"$ref": "#/components/schemas/Shared"}}}
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        assert!(outcome.cycles_cut.is_empty());

        let expected = json!({"type": "string", "format": "uuid"});
        assert_eq!(
            outcome.document["components"]["schemas"]["Left"]["properties"]["id"],
            expected
        );
        assert_eq!(
            outcome.document["components"]["schemas"]["Right"]["properties"]["id"],
            expected
        );
    }

    #[test]
    fn structurally_equal_distinct_targets_are_not_confused() {
        // Two identical component schemas with different names: identity is
        // the pointer, not the value, so neither is treated as a cycle of
        // the other.
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "First": {"type": "object", "properties": {"x": {"type": "integer"}}},
                "Second": {"type": "object", "properties": {"x": {"type": "integer"}}},
                "Holder": {
                    "type": "object",
                    "properties": {
                        "a": {"$ref": "#/components/schemas/First"},
                        "b": {"$ref": "#/components/schemas/Second"}
                    }
                }
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        assert!(outcome.cycles_cut.is_empty());
        assert_eq!(count_markers(&outcome.document, CYCLE_MARKER), 0);
        assert_eq!(
            outcome.document["components"]["schemas"]["Holder"]["properties"]["a"]["type"],
            "object"
        );
    }

    #[test]
    fn ref_description_sibling_survives_expansion() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "Pet": {"type": "object"},
                "Wrapper": {
                    "type": "object",
                    "properties": {
                        "pet": {"$ref": "#/components/schemas/Pet", "description": "the pet"}
                    }
                }
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        let expanded = &outcome.document["components"]["schemas"]["Wrapper"]["properties"]["pet"];
        assert_eq!(expanded["type"], "object");
        assert_eq!(expanded["description"], "the pet");
    }

    #[test]
    fn visit_budget_degrades_to_error_placeholder() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "A": {"type": "object", "properties": {
                    "p1": {"$ref": "#/components/schemas/B"},
                    "p2": {"$ref": "#/components/schemas/B"}
                }},
                "B": {"type": "object", "properties": {
                    "q1": {"type": "string"},
                    "q2": {"type": "string"}
                }}
            }}
        });
        let tight = IngestConfig {
            max_node_visits: 10,
            ..Default::default()
        };
        let outcome = sanitize(&doc, &tight);
        assert!(outcome.subtree_errors > 0);
        assert!(count_markers(&outcome.document, ERROR_MARKER) > 0);
        // The document as a whole still serializes.
        assert!(serde_json::to_string(&outcome.document).is_ok());
    }

    #[test]
    fn depth_bound_degrades_to_error_placeholder() {
        let mut doc = json!({"leaf": true});
        for _ in 0..40 {
            doc = json!({"nested": doc});
        }
        let shallow = IngestConfig {
            max_depth: 8,
            ..Default::default()
        };
        let outcome = sanitize(&doc, &shallow);
        assert!(outcome.subtree_errors > 0);
        assert!(count_markers(&outcome.document, ERROR_MARKER) > 0);
    }

    #[test]
    fn sanitized_output_round_trips_through_json() {
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "A": {"properties": {"b": {"$ref": "#/components/schemas/B"}}},
                "B": {"properties": {"a": {"$ref": "#/components/schemas/A"}}}
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        let text = serde_json::to_string(&outcome.document).expect("serialize");
        let reparsed: Value = serde_json::from_str(&text).expect("reparse");
        assert_eq!(reparsed, outcome.document);
    }

    #[test]
    fn ref_into_own_ancestor_container_is_a_cycle() {
        // A reference back into `components` itself, not through another
        // $ref: the ancestor is on the active path by location.
        let doc = json!({
            "openapi": "3.0.3",
            "components": {"schemas": {
                "Evil": {"properties": {"all": {"$ref": "#/components"}}}
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        assert_eq!(outcome.cycles_cut.len(), 1);
        let cut = &outcome.document["components"]["schemas"]["Evil"]["properties"]["all"];
        assert_eq!(cut[CYCLE_MARKER], true);
        assert_eq!(cut["originalType"], "components");
    }

    #[test]
    fn pointer_type_names() {
        assert_eq!(pointer_type_name("/components/schemas/Pet"), "Pet");
        assert_eq!(pointer_type_name("/paths/~1pets~1{id}"), "/pets/{id}");
        assert_eq!(pointer_type_name(""), "document");
    }

    #[test]
    fn placeholder_predicate() {
        let doc = json!({
            "components": {"schemas": {
                "N": {"properties": {"n": {"$ref": "#/components/schemas/N"}}}
            }}
        });
        let outcome = sanitize(&doc, &cfg());
        let cut = &outcome.document["components"]["schemas"]["N"]["properties"]["n"];
        assert!(is_placeholder(cut));
        assert!(!is_placeholder(&json!({"type": "object"})));
    }
}
