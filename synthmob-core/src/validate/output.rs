//! Structured output validation for visual, world, and game outputs.
//!
//! Size is checked before content; content checks walk the parsed JSON
//! and report one human-readable detail per broken rule.

use std::collections::HashSet;
use std::f64::consts::TAU;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use synthmob_types::world::{
    MAX_CATALOG_ITEMS, MAX_ELEMENTS, MAX_GAME_OUTPUT_BYTES, MAX_GENERATED_ITEMS,
    MAX_VISUAL_OUTPUT_BYTES, MAX_VOXELS, MAX_WORLD_OUTPUT_BYTES, VOXEL_XZ_EXTENT, VOXEL_Y_MAX,
};
use synthmob_types::Validation;

/// Element types accepted in world output.
const ELEMENT_TYPES: [&str; 12] = [
    "box", "sphere", "cylinder", "cone", "torus", "plane", "ring", "pyramid", "column", "arch",
    "crystal", "light",
];

/// Shape types accepted in visual output.
const SHAPE_TYPES: [&str; 8] = [
    "circle", "square", "triangle", "line", "wave", "spiral", "ribbon", "particle",
];

/// Maximum shapes in a visual output.
const MAX_SHAPES: usize = 40;

/// Maximum objects in a game output.
const MAX_GAME_OBJECTS: usize = 20;

/// Scale bounds for world elements.
const SCALE_MIN: f64 = 0.05;
const SCALE_MAX: f64 = 30.0;

/// Coordinate half-extent for element positions.
const COORD_EXTENT: f64 = 100.0;

/// Which schema a structured output is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Visual,
    World,
    Game,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputKind::Visual => "visual",
            OutputKind::World => "world",
            OutputKind::Game => "game",
        }
    }

    fn max_bytes(&self) -> usize {
        match self {
            OutputKind::Visual => MAX_VISUAL_OUTPUT_BYTES,
            OutputKind::World => MAX_WORLD_OUTPUT_BYTES,
            OutputKind::Game => MAX_GAME_OUTPUT_BYTES,
        }
    }
}

fn color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap())
}

/// Validate a serialized output of the given kind.
pub fn validate_output(kind: OutputKind, json: &str) -> Validation {
    let mut v = Validation::ok();

    if json.len() > kind.max_bytes() {
        v.error(format!(
            "{} output exceeds {} bytes (got {})",
            kind.as_str(),
            kind.max_bytes(),
            json.len()
        ));
        return v;
    }

    let parsed: Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            v.error(format!("invalid JSON: {}", e));
            return v;
        }
    };
    let Some(obj) = parsed.as_object() else {
        v.error(format!("{} output must be a JSON object", kind.as_str()));
        return v;
    };

    match kind {
        OutputKind::World => check_world(obj, &mut v),
        OutputKind::Visual => check_visual(obj, &mut v),
        OutputKind::Game => check_game(obj, &mut v),
    }
    v
}

fn check_world(obj: &serde_json::Map<String, Value>, v: &mut Validation) {
    for key in ["sky", "fog", "ground", "lighting"] {
        if let Some(value) = obj.get(key) {
            if let Some(s) = value.as_str() {
                if s.starts_with('#') && !color_re().is_match(s) {
                    v.error(format!("{}: invalid color {}", key, s));
                }
            }
        }
    }

    if let Some(elements) = obj.get("elements") {
        match elements.as_array() {
            Some(items) => {
                if items.len() > MAX_ELEMENTS {
                    v.error(format!("too many elements (max {})", MAX_ELEMENTS));
                }
                for (i, el) in items.iter().enumerate() {
                    check_element(i, el, v);
                }
            }
            None => v.error("elements must be an array"),
        }
    }

    if let Some(voxels) = obj.get("voxels") {
        match voxels.as_array() {
            Some(items) => check_voxels(items, v),
            None => v.error("voxels must be an array"),
        }
    }

    check_item_array(obj, "catalog_items", MAX_CATALOG_ITEMS, v);
    check_item_array(obj, "generated_items", MAX_GENERATED_ITEMS, v);
    if let Some(Value::Array(items)) = obj.get("generated_items") {
        for (i, item) in items.iter().enumerate() {
            if item.get("url").and_then(Value::as_str).is_none() {
                v.error(format!("generated_items[{}]: missing url", i));
            }
        }
    }
}

fn check_element(index: usize, el: &Value, v: &mut Validation) {
    let Some(obj) = el.as_object() else {
        v.error(format!("elements[{}] must be an object", index));
        return;
    };

    match obj.get("type").and_then(Value::as_str) {
        Some(t) if ELEMENT_TYPES.contains(&t) => {}
        Some(t) => v.error(format!("elements[{}]: unknown type {}", index, t)),
        None => v.error(format!("elements[{}]: missing type", index)),
    }

    if let Some(color) = obj.get("color").and_then(Value::as_str) {
        if !color_re().is_match(color) {
            v.error(format!("elements[{}]: invalid color {}", index, color));
        }
    }

    if let Some(scale) = obj.get("scale") {
        let components: Vec<f64> = match scale {
            Value::Number(n) => n.as_f64().into_iter().collect(),
            Value::Object(axes) => ["x", "y", "z"]
                .iter()
                .filter_map(|a| axes.get(*a).and_then(Value::as_f64))
                .collect(),
            _ => Vec::new(),
        };
        for c in components {
            if !(SCALE_MIN..=SCALE_MAX).contains(&c) {
                v.error(format!(
                    "elements[{}]: scale {} outside {}..{}",
                    index, c, SCALE_MIN, SCALE_MAX
                ));
            }
        }
    }

    for field in ["opacity", "metalness", "roughness"] {
        if let Some(value) = obj.get(field).and_then(Value::as_f64) {
            if !(0.0..=1.0).contains(&value) {
                v.error(format!("elements[{}]: {} outside 0..1", index, field));
            }
        }
    }

    if let Some(Value::Object(pos)) = obj.get("position") {
        for axis in ["x", "y", "z"] {
            if let Some(value) = pos.get(axis).and_then(Value::as_f64) {
                if value.abs() > COORD_EXTENT {
                    v.error(format!(
                        "elements[{}]: position.{} outside +/-{}",
                        index, axis, COORD_EXTENT
                    ));
                }
            }
        }
    }

    if let Some(Value::Object(rot)) = obj.get("rotation") {
        for axis in ["x", "y", "z"] {
            if let Some(value) = rot.get(axis).and_then(Value::as_f64) {
                if value.abs() > TAU {
                    v.error(format!("elements[{}]: rotation.{} outside +/-2pi", index, axis));
                }
            }
        }
    }
}

fn check_voxels(items: &[Value], v: &mut Validation) {
    if items.len() > MAX_VOXELS {
        v.error(format!("too many voxels (max {})", MAX_VOXELS));
    }
    let mut seen: HashSet<(i64, i64, i64)> = HashSet::new();
    for (i, voxel) in items.iter().enumerate() {
        let Some(obj) = voxel.as_object() else {
            v.error(format!("voxels[{}] must be an object", i));
            continue;
        };
        let coords: Vec<Option<i64>> = ["x", "y", "z"]
            .iter()
            .map(|a| obj.get(*a).and_then(Value::as_i64))
            .collect();
        let (Some(x), Some(y), Some(z)) = (coords[0], coords[1], coords[2]) else {
            v.error(format!("voxels[{}]: x, y, z must be integers", i));
            continue;
        };
        if !(0..=VOXEL_Y_MAX).contains(&y) {
            v.error(format!("voxels[{}]: y outside 0..{}", i, VOXEL_Y_MAX));
        }
        if x.abs() > VOXEL_XZ_EXTENT || z.abs() > VOXEL_XZ_EXTENT {
            v.error(format!("voxels[{}]: x/z outside +/-{}", i, VOXEL_XZ_EXTENT));
        }
        if let Some(color) = obj.get("color").and_then(Value::as_str) {
            if !color_re().is_match(color) {
                v.error(format!("voxels[{}]: invalid color {}", i, color));
            }
        }
        if !seen.insert((x, y, z)) {
            v.error(format!("voxels[{}]: duplicate position ({},{},{})", i, x, y, z));
        }
    }
}

fn check_item_array(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    max: usize,
    v: &mut Validation,
) {
    let Some(value) = obj.get(key) else { return };
    match value.as_array() {
        Some(items) => {
            if items.len() > max {
                v.error(format!("too many {} (max {})", key, max));
            }
            for (i, item) in items.iter().enumerate() {
                if !item.is_object() {
                    v.error(format!("{}[{}] must be an object", key, i));
                }
            }
        }
        None => v.error(format!("{} must be an array", key)),
    }
}

fn check_visual(obj: &serde_json::Map<String, Value>, v: &mut Validation) {
    if let Some(bg) = obj.get("background").and_then(Value::as_str) {
        if !color_re().is_match(bg) {
            v.error(format!("background: invalid color {}", bg));
        }
    }
    let Some(shapes) = obj.get("shapes") else { return };
    let Some(items) = shapes.as_array() else {
        v.error("shapes must be an array");
        return;
    };
    if items.len() > MAX_SHAPES {
        v.error(format!("too many shapes (max {})", MAX_SHAPES));
    }
    for (i, shape) in items.iter().enumerate() {
        let Some(sobj) = shape.as_object() else {
            v.error(format!("shapes[{}] must be an object", i));
            continue;
        };
        match sobj.get("type").and_then(Value::as_str) {
            Some(t) if SHAPE_TYPES.contains(&t) => {}
            Some(t) => v.error(format!("shapes[{}]: unknown type {}", i, t)),
            None => v.error(format!("shapes[{}]: missing type", i)),
        }
        if let Some(color) = sobj.get("color").and_then(Value::as_str) {
            if !color_re().is_match(color) {
                v.error(format!("shapes[{}]: invalid color {}", i, color));
            }
        }
        if let Some(opacity) = sobj.get("opacity").and_then(Value::as_f64) {
            if !(0.0..=1.0).contains(&opacity) {
                v.error(format!("shapes[{}]: opacity outside 0..1", i));
            }
        }
    }
}

fn check_game(obj: &serde_json::Map<String, Value>, v: &mut Validation) {
    if let Some(objects) = obj.get("objects") {
        let Some(items) = objects.as_array() else {
            v.error("objects must be an array");
            return;
        };
        if items.len() > MAX_GAME_OBJECTS {
            v.error(format!("too many objects (max {})", MAX_GAME_OBJECTS));
        }
        for (i, item) in items.iter().enumerate() {
            let Some(iobj) = item.as_object() else {
                v.error(format!("objects[{}] must be an object", i));
                continue;
            };
            if iobj.get("type").and_then(Value::as_str).is_none() {
                v.error(format!("objects[{}]: missing type", i));
            }
            if let Some(Value::Object(pos)) = iobj.get("position") {
                for axis in ["x", "y", "z"] {
                    if let Some(value) = pos.get(axis).and_then(Value::as_f64) {
                        if value.abs() > COORD_EXTENT {
                            v.error(format!(
                                "objects[{}]: position.{} outside +/-{}",
                                i, axis, COORD_EXTENT
                            ));
                        }
                    }
                }
            }
        }
    }
    if let Some(rules) = obj.get("rules") {
        if !rules.is_object() {
            v.error("rules must be an object");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_checked_before_content() {
        let big = format!("{{\"pad\":\"{}\"}}", "x".repeat(MAX_GAME_OUTPUT_BYTES));
        let v = validate_output(OutputKind::Game, &big);
        assert!(!v.accepted);
        assert!(v.errors[0].contains("exceeds"));
    }

    #[test]
    fn invalid_json_rejected() {
        let v = validate_output(OutputKind::World, "{nope");
        assert!(!v.accepted);
        assert!(v.errors[0].contains("invalid JSON"));
    }

    #[test]
    fn world_elements_schema() {
        let ok = r##"{"sky":"#000000","elements":[{"type":"box","color":"#ff0000","scale":1.5,"position":{"x":10,"y":0,"z":-10},"opacity":0.5}]}"##;
        assert!(validate_output(OutputKind::World, ok).accepted);

        let bad_type = r#"{"elements":[{"type":"blob"}]}"#;
        assert!(!validate_output(OutputKind::World, bad_type).accepted);

        let bad_scale = r#"{"elements":[{"type":"box","scale":31.0}]}"#;
        assert!(!validate_output(OutputKind::World, bad_scale).accepted);

        let bad_color = r#"{"elements":[{"type":"box","color":"red"}]}"#;
        assert!(!validate_output(OutputKind::World, bad_color).accepted);

        let bad_coord = r#"{"elements":[{"type":"box","position":{"x":101,"y":0,"z":0}}]}"#;
        assert!(!validate_output(OutputKind::World, bad_coord).accepted);

        let bad_rot = r#"{"elements":[{"type":"box","rotation":{"x":6.5,"y":0,"z":0}}]}"#;
        assert!(!validate_output(OutputKind::World, bad_rot).accepted);
    }

    #[test]
    fn duplicate_voxel_positions_rejected() {
        let dup = r#"{"voxels":[{"x":1,"y":2,"z":3},{"x":1,"y":2,"z":3}]}"#;
        let v = validate_output(OutputKind::World, dup);
        assert!(!v.accepted);
        assert!(v.errors.iter().any(|e| e.contains("duplicate position")));
    }

    #[test]
    fn voxel_bounds() {
        let bad_y = r#"{"voxels":[{"x":0,"y":101,"z":0}]}"#;
        assert!(!validate_output(OutputKind::World, bad_y).accepted);
        let bad_x = r#"{"voxels":[{"x":-101,"y":0,"z":0}]}"#;
        assert!(!validate_output(OutputKind::World, bad_x).accepted);
        let float = r#"{"voxels":[{"x":0.5,"y":0,"z":0}]}"#;
        assert!(!validate_output(OutputKind::World, float).accepted);
        let ok = r##"{"voxels":[{"x":-100,"y":0,"z":100,"color":"#abc"}]}"##;
        assert!(validate_output(OutputKind::World, ok).accepted);
    }

    #[test]
    fn generated_items_need_urls() {
        let missing = r#"{"generated_items":[{"name":"tree"}]}"#;
        assert!(!validate_output(OutputKind::World, missing).accepted);
        let ok = r#"{"generated_items":[{"name":"tree","url":"https://assets/tree.glb"}]}"#;
        assert!(validate_output(OutputKind::World, ok).accepted);
    }

    #[test]
    fn visual_schema() {
        let ok = r##"{"background":"#112233","shapes":[{"type":"circle","color":"#fff","opacity":0.9}]}"##;
        assert!(validate_output(OutputKind::Visual, ok).accepted);
        let bad = r#"{"shapes":[{"type":"hexagon"}]}"#;
        assert!(!validate_output(OutputKind::Visual, bad).accepted);
    }

    #[test]
    fn game_schema() {
        let ok = r#"{"name":"tag","objects":[{"type":"goal","position":{"x":5,"y":0,"z":5}}],"rules":{"win":"touch"}}"#;
        assert!(validate_output(OutputKind::Game, ok).accepted);
        let bad = r#"{"objects":[{"position":{"x":5}}]}"#;
        assert!(!validate_output(OutputKind::Game, bad).accepted);
    }
}
