//! Standard-library metadata tables.
//!
//! The compiler core consumes three tables supplied by the host: events
//! (name to parameter signature), constants (name to typed value), and
//! functions (name to signature plus optimizer-relevant flags). It never
//! mutates them. A curated builtin table covering the common library
//! surface ships here; an embedder can construct its own [`Library`].
//!
//! Also here are the pure metadata tables the library-aware optimizer
//! needs: the list extraction compatibility pairs, the per-index return
//! types of `llGetObjectDetails`, and the per-parameter return types of
//! `llGetPrimitiveParams`.

use std::sync::OnceLock;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::types::{Type, Value};

/// Signature of a library event.
#[derive(Clone, Debug)]
pub struct EventSig {
    pub param_types: Vec<Type>,
    pub param_names: Vec<&'static str>,
}

/// Signature and optimizer flags of a library function.
#[derive(Clone, Debug)]
pub struct LibFunc {
    /// Return type; `None` for void functions.
    pub ret: Option<Type>,
    pub param_types: Vec<Type>,
    /// Side-effect free: calling it observes nothing and changes nothing.
    pub sef: bool,
    /// Script terminator (`llResetScript` and friends): control does not
    /// proceed past the call.
    pub stop: bool,
    /// When set, casting an untyped lazy-list subscript to this type
    /// resolves to this function.
    pub list_to: Option<Type>,
}

/// The three host tables plus derived lookup data.
#[derive(Clone, Debug, Default)]
pub struct Library {
    pub events: IndexMap<String, EventSig>,
    pub constants: IndexMap<String, Value>,
    pub funcs: IndexMap<String, LibFunc>,
    /// Derived: type -> extraction function name (from `list_to`).
    pub type_to_extraction: FxHashMap<Type, String>,
}

impl Library {
    /// Rebuild the derived extraction map after filling the tables.
    pub fn finish(mut self) -> Self {
        self.type_to_extraction.clear();
        for (name, f) in &self.funcs {
            if let Some(t) = f.list_to {
                self.type_to_extraction.insert(t, name.clone());
            }
        }
        self
    }
}

/// Per-index return types of `llGetObjectDetails`, one tag per
/// `OBJECT_*` constant. Index 40 is `OBJECT_ANIMATED_SLOTS_AVAILABLE`.
pub const OBJ_DETAILS_TYPES: &str = "issvrvkkkiiififfffkiiiiiiffkiviiksiisiiii";

/// Per-parameter return types of `llGetPrimitiveParams`, indexed by the
/// `PRIM_*` constant. `None` marks an unassigned code; a `*` inside a
/// string marks a parameter whose arity is context-dependent, so nothing
/// after it can be predicted.
pub const PRIM_PARAMS_TYPES: [Option<&str>; 43] = [
    None,          // 0 (unassigned)
    Some("i*"),    // 1=PRIM_TYPE_LEGACY
    Some("i"),     // 2=PRIM_MATERIAL
    Some("i"),     // 3=PRIM_PHYSICS
    Some("i"),     // 4=PRIM_TEMP_ON_REZ
    Some("i"),     // 5=PRIM_PHANTOM
    Some("v"),     // 6=PRIM_POSITION
    Some("v"),     // 7=PRIM_SIZE
    Some("r"),     // 8=PRIM_ROTATION
    Some("i*"),    // 9=PRIM_TYPE
    None,
    None,
    None,
    None,
    None,
    None,
    None,
    Some("svvf"),    // 17=PRIM_TEXTURE
    Some("vf"),      // 18=PRIM_COLOR
    Some("ii"),      // 19=PRIM_BUMP_SHINY
    Some("i"),       // 20=PRIM_FULLBRIGHT
    Some("iiffffv"), // 21=PRIM_FLEXIBLE
    Some("i"),       // 22=PRIM_TEXGEN
    Some("ivfff"),   // 23=PRIM_POINT_LIGHT
    None,
    Some("f"),       // 25=PRIM_GLOW
    Some("svf"),     // 26=PRIM_TEXT
    Some("s"),       // 27=PRIM_NAME
    Some("s"),       // 28=PRIM_DESC
    Some("r"),       // 29=PRIM_ROT_LOCAL
    Some("i"),       // 30=PRIM_PHYSICS_SHAPE_TYPE
    None,
    Some("vff"),     // 32=PRIM_OMEGA
    Some("v"),       // 33=PRIM_POS_LOCAL
    Some(""),        // 34=PRIM_LINK_TARGET
    Some("v"),       // 35=PRIM_SLICE
    Some("svvfvii"), // 36=PRIM_SPECULAR
    Some("svvf"),    // 37=PRIM_NORMAL
    Some("ii"),      // 38=PRIM_ALPHA_MODE
    Some("i"),       // 39=PRIM_ALLOW_UNSIT
    Some("i"),       // 40=PRIM_SCRIPTED_SIT_ONLY
    Some("ivv"),     // 41=PRIM_SIT_TARGET
    Some("sfff"),    // 42=PRIM_PROJECTOR
];

/// `PRIM_*` codes that take a face or link argument. Reading them can
/// raise runtime errors, so calls using them are never folded.
pub fn prim_param_takes_arg(code: i32) -> bool {
    matches!(code, 17 | 18 | 19 | 20 | 22 | 25 | 34 | 36 | 37 | 38)
}

/// Whether a list extraction function returning `ret` can extract an
/// element whose stored type is `stored` without falling back to the
/// default value. Both arguments are one-letter type tags.
pub fn list_compat(ret: char, stored: char) -> bool {
    matches!(
        (ret, stored),
        ('s', 's')
            | ('s', 'k')
            | ('s', 'i')
            | ('s', 'f')
            | ('s', 'v')
            | ('s', 'r')
            | ('k', 's')
            | ('k', 'k')
            | ('i', 's')
            | ('i', 'i')
            | ('i', 'f')
            | ('f', 's')
            | ('f', 'i')
            | ('f', 'f')
            | ('v', 'v')
            | ('r', 'r')
    )
}

/// The value a list extraction function returns when the requested
/// element does not exist or has an incompatible type.
pub fn default_list_value(func: &str) -> Option<Value> {
    Some(match func {
        "llList2Integer" => Value::Integer(0),
        "llList2Float" => Value::Float(0.0),
        "llList2String" => Value::Str(String::new()),
        "llList2Key" => Value::Key(String::new()),
        "llList2Vector" => Value::Vector([0.0; 3]),
        "llList2Rot" => Value::Rotation([0.0, 0.0, 0.0, 1.0]),
        _ => return None,
    })
}

/// Functions whose `key` arguments must not be canonicalized to `""`.
pub fn keeps_key_arguments(func: &str) -> bool {
    // Not sure about llRemoteDataReply but fall on the safe side.
    matches!(func, "llMessageLinked" | "llRemoteDataReply")
}

/// Sensor-family functions whose arc argument saturates at PI.
pub fn is_sensor_function(func: &str) -> bool {
    matches!(func, "llSensor" | "llSensorRepeat")
}

const NULL_KEY: &str = "00000000-0000-0000-0000-000000000000";

macro_rules! ty {
    (i) => {
        Type::Integer
    };
    (f) => {
        Type::Float
    };
    (s) => {
        Type::String
    };
    (k) => {
        Type::Key
    };
    (v) => {
        Type::Vector
    };
    (r) => {
        Type::Rotation
    };
    (l) => {
        Type::List
    };
}

macro_rules! params {
    ($($t:ident)*) => { vec![$(ty!($t)),*] };
}

fn events() -> IndexMap<String, EventSig> {
    let mut ev = IndexMap::new();
    let mut add = |name: &str, pt: Vec<Type>, pn: Vec<&'static str>| {
        ev.insert(name.to_string(), EventSig {
            param_types: pt,
            param_names: pn,
        });
    };
    add("state_entry", params![], vec![]);
    add("state_exit", params![], vec![]);
    add("touch_start", params![i], vec!["total_number"]);
    add("touch", params![i], vec!["total_number"]);
    add("touch_end", params![i], vec!["total_number"]);
    add("collision_start", params![i], vec!["total_number"]);
    add("collision", params![i], vec!["total_number"]);
    add("collision_end", params![i], vec!["total_number"]);
    add("timer", params![], vec![]);
    add("listen", params![i s k s], vec!["channel", "name", "id", "message"]);
    add("sensor", params![i], vec!["total_number"]);
    add("no_sensor", params![], vec![]);
    add("changed", params![i], vec!["change"]);
    add("on_rez", params![i], vec!["start_param"]);
    add("attach", params![k], vec!["id"]);
    add("dataserver", params![k s], vec!["queryid", "data"]);
    add("link_message", params![i i s k], vec!["sender_num", "num", "str", "id"]);
    add("money", params![k i], vec!["id", "amount"]);
    add("control", params![k i i], vec!["id", "held", "change"]);
    add("http_response", params![k i l s], vec!["request_id", "status", "metadata", "body"]);
    add("at_target", params![i v v], vec!["tnum", "targetpos", "ourpos"]);
    add("not_at_target", params![], vec![]);
    add("run_time_permissions", params![i], vec!["perm"]);
    add("object_rez", params![k], vec!["id"]);
    add("moving_start", params![], vec![]);
    add("moving_end", params![], vec![]);
    ev
}

fn constants() -> IndexMap<String, Value> {
    let mut c = IndexMap::new();
    let mut add = |name: &str, v: Value| {
        c.insert(name.to_string(), v);
    };
    add("NULL_KEY", Value::Key(NULL_KEY.into()));
    add("EOF", Value::Str("\n\n\n".into()));
    add("ZERO_VECTOR", Value::Vector([0.0; 3]));
    add("ZERO_ROTATION", Value::Rotation([0.0, 0.0, 0.0, 1.0]));
    add("PI", Value::Float(std::f32::consts::PI));
    add("TWO_PI", Value::Float(2.0 * std::f32::consts::PI));
    add("PI_BY_TWO", Value::Float(std::f32::consts::FRAC_PI_2));
    add("DEG_TO_RAD", Value::Float(std::f32::consts::PI / 180.0));
    add("RAD_TO_DEG", Value::Float(180.0 / std::f32::consts::PI));
    add("SQRT2", Value::Float(std::f32::consts::SQRT_2));
    add("PUBLIC_CHANNEL", Value::Integer(0));
    add("DEBUG_CHANNEL", Value::Integer(0x7FFFFFFF));
    add("ALL_SIDES", Value::Integer(-1));
    add("LINK_ROOT", Value::Integer(1));
    add("LINK_SET", Value::Integer(-1));
    add("LINK_ALL_OTHERS", Value::Integer(-2));
    add("LINK_ALL_CHILDREN", Value::Integer(-3));
    add("LINK_THIS", Value::Integer(-4));
    add("AGENT", Value::Integer(1));
    add("ACTIVE", Value::Integer(2));
    add("PASSIVE", Value::Integer(4));
    add("SCRIPTED", Value::Integer(8));
    add("CHANGED_INVENTORY", Value::Integer(1));
    add("CHANGED_COLOR", Value::Integer(2));
    add("CHANGED_SHAPE", Value::Integer(4));
    add("CHANGED_SCALE", Value::Integer(8));
    add("CHANGED_TEXTURE", Value::Integer(16));
    add("CHANGED_LINK", Value::Integer(32));
    add("CHANGED_OWNER", Value::Integer(128));
    add("CHANGED_REGION", Value::Integer(256));
    add("CHANGED_TELEPORT", Value::Integer(512));
    add("TYPE_INTEGER", Value::Integer(1));
    add("TYPE_FLOAT", Value::Integer(2));
    add("TYPE_STRING", Value::Integer(3));
    add("TYPE_KEY", Value::Integer(4));
    add("TYPE_VECTOR", Value::Integer(5));
    add("TYPE_ROTATION", Value::Integer(6));
    add("TYPE_INVALID", Value::Integer(0));
    add("STATUS_PHYSICS", Value::Integer(1));
    add("STATUS_PHANTOM", Value::Integer(16));
    add("PERMISSION_TAKE_CONTROLS", Value::Integer(4));
    add("PERMISSION_TRIGGER_ANIMATION", Value::Integer(16));
    add("PERMISSION_ATTACH", Value::Integer(32));
    add("INVENTORY_ALL", Value::Integer(-1));
    add("INVENTORY_NONE", Value::Integer(-1));
    add("INVENTORY_TEXTURE", Value::Integer(0));
    add("INVENTORY_SOUND", Value::Integer(1));
    add("INVENTORY_OBJECT", Value::Integer(6));
    add("INVENTORY_SCRIPT", Value::Integer(10));
    add("INVENTORY_NOTECARD", Value::Integer(7));
    add("STRING_TRIM_HEAD", Value::Integer(1));
    add("STRING_TRIM_TAIL", Value::Integer(2));
    add("STRING_TRIM", Value::Integer(3));
    // PRIM_* codes used with llGetPrimitiveParams
    add("PRIM_TYPE", Value::Integer(9));
    add("PRIM_MATERIAL", Value::Integer(2));
    add("PRIM_PHYSICS", Value::Integer(3));
    add("PRIM_TEMP_ON_REZ", Value::Integer(4));
    add("PRIM_PHANTOM", Value::Integer(5));
    add("PRIM_POSITION", Value::Integer(6));
    add("PRIM_SIZE", Value::Integer(7));
    add("PRIM_ROTATION", Value::Integer(8));
    add("PRIM_TEXTURE", Value::Integer(17));
    add("PRIM_COLOR", Value::Integer(18));
    add("PRIM_FULLBRIGHT", Value::Integer(20));
    add("PRIM_TEXGEN", Value::Integer(22));
    add("PRIM_GLOW", Value::Integer(25));
    add("PRIM_TEXT", Value::Integer(26));
    add("PRIM_NAME", Value::Integer(27));
    add("PRIM_DESC", Value::Integer(28));
    add("PRIM_ROT_LOCAL", Value::Integer(29));
    add("PRIM_POS_LOCAL", Value::Integer(33));
    add("PRIM_LINK_TARGET", Value::Integer(34));
    // OBJECT_* codes used with llGetObjectDetails
    add("OBJECT_UNKNOWN_DETAIL", Value::Integer(-1));
    add("OBJECT_NAME", Value::Integer(1));
    add("OBJECT_DESC", Value::Integer(2));
    add("OBJECT_POS", Value::Integer(3));
    add("OBJECT_ROT", Value::Integer(4));
    add("OBJECT_VELOCITY", Value::Integer(5));
    add("OBJECT_OWNER", Value::Integer(6));
    add("OBJECT_GROUP", Value::Integer(7));
    add("OBJECT_CREATOR", Value::Integer(8));
    add("OBJECT_RUNNING_SCRIPT_COUNT", Value::Integer(9));
    add("OBJECT_TOTAL_SCRIPT_COUNT", Value::Integer(10));
    c
}

fn functions() -> IndexMap<String, LibFunc> {
    let mut fns = IndexMap::new();
    let mut add = |name: &str, ret: Option<Type>, pt: Vec<Type>, sef: bool| {
        fns.insert(name.to_string(), LibFunc {
            ret,
            param_types: pt,
            sef,
            stop: false,
            list_to: None,
        });
    };

    // Communication and side-effecting functions.
    add("llSay", None, params![i s], false);
    add("llWhisper", None, params![i s], false);
    add("llShout", None, params![i s], false);
    add("llRegionSay", None, params![i s], false);
    add("llOwnerSay", None, params![s], false);
    add("llInstantMessage", None, params![k s], false);
    add("llDialog", None, params![k s l i], false);
    add("llListen", Some(ty!(i)), params![i s k s], false);
    add("llListenRemove", None, params![i], false);
    add("llListenControl", None, params![i i], false);
    add("llSetTimerEvent", None, params![f], false);
    add("llSleep", None, params![f], false);
    add("llSetText", None, params![s v f], false);
    add("llSetColor", None, params![v i], false);
    add("llSetPos", None, params![v], false);
    add("llSetRot", None, params![r], false);
    add("llSetScale", None, params![v], false);
    add("llSetPrimitiveParams", None, params![l], false);
    add("llSetLinkPrimitiveParamsFast", None, params![i l], false);
    add("llSensor", None, params![s k i f f], false);
    add("llSensorRepeat", None, params![s k i f f f], false);
    add("llSensorRemove", None, params![], false);
    add("llMessageLinked", None, params![i i s k], false);
    add("llRemoteDataReply", None, params![k k s i], false);
    add("llTriggerSound", None, params![s f], false);
    add("llPlaySound", None, params![s f], false);
    add("llApplyImpulse", None, params![v i], false);
    add("llStartAnimation", None, params![s], false);
    add("llStopAnimation", None, params![s], false);
    add("llRequestPermissions", None, params![k i], false);
    add("llGiveInventory", None, params![k s], false);
    add("llRezObject", None, params![s v v r i], false);
    add("llHTTPRequest", Some(ty!(k)), params![s l s], false);
    add("llRequestAgentData", Some(ty!(k)), params![k i], false);
    add("llResetTime", None, params![], false);
    add("llSetStatus", None, params![i i], false);
    add("llTakeControls", None, params![i i i], false);
    add("llReleaseControls", None, params![], false);

    // Pure queries.
    add("llGetOwner", Some(ty!(k)), params![], true);
    add("llGetOwnerKey", Some(ty!(k)), params![k], true);
    add("llGetKey", Some(ty!(k)), params![], true);
    add("llGetPos", Some(ty!(v)), params![], true);
    add("llGetLocalPos", Some(ty!(v)), params![], true);
    add("llGetRot", Some(ty!(r)), params![], true);
    add("llGetScale", Some(ty!(v)), params![], true);
    add("llGetTime", Some(ty!(f)), params![], true);
    add("llGetUnixTime", Some(ty!(i)), params![], true);
    add("llGetTimestamp", Some(ty!(s)), params![], true);
    add("llGetAgentInfo", Some(ty!(i)), params![k], true);
    add("llKey2Name", Some(ty!(s)), params![k], true);
    add("llGetObjectName", Some(ty!(s)), params![], true);
    add("llGetObjectDesc", Some(ty!(s)), params![], true);
    add("llGetObjectDetails", Some(ty!(l)), params![k l], true);
    add("llGetPrimitiveParams", Some(ty!(l)), params![l], true);
    add("llGetLinkPrimitiveParams", Some(ty!(l)), params![i l], true);
    add("llGetLinkNumber", Some(ty!(i)), params![], true);
    add("llGetNumberOfPrims", Some(ty!(i)), params![], true);
    add("llGetInventoryNumber", Some(ty!(i)), params![i], true);
    add("llGetInventoryName", Some(ty!(s)), params![i i], true);
    add("llGetInventoryType", Some(ty!(i)), params![s], true);
    add("llGetColor", Some(ty!(v)), params![i], true);
    add("llGetFreeMemory", Some(ty!(i)), params![], true);
    add("llAvatarOnSitTarget", Some(ty!(k)), params![], true);
    add("llDetectedKey", Some(ty!(k)), params![i], true);
    add("llDetectedName", Some(ty!(s)), params![i], true);
    add("llDetectedPos", Some(ty!(v)), params![i], true);
    add("llDetectedType", Some(ty!(i)), params![i], true);

    // Math.
    add("llFrand", Some(ty!(f)), params![f], false);
    add("llFloor", Some(ty!(i)), params![f], true);
    add("llCeil", Some(ty!(i)), params![f], true);
    add("llRound", Some(ty!(i)), params![f], true);
    add("llAbs", Some(ty!(i)), params![i], true);
    add("llFabs", Some(ty!(f)), params![f], true);
    add("llSqrt", Some(ty!(f)), params![f], true);
    add("llPow", Some(ty!(f)), params![f f], true);
    add("llLog", Some(ty!(f)), params![f], true);
    add("llLog10", Some(ty!(f)), params![f], true);
    add("llSin", Some(ty!(f)), params![f], true);
    add("llCos", Some(ty!(f)), params![f], true);
    add("llTan", Some(ty!(f)), params![f], true);
    add("llAtan2", Some(ty!(f)), params![f f], true);
    add("llVecMag", Some(ty!(f)), params![v], true);
    add("llVecNorm", Some(ty!(v)), params![v], true);
    add("llVecDist", Some(ty!(f)), params![v v], true);
    add("llRot2Euler", Some(ty!(v)), params![r], true);
    add("llEuler2Rot", Some(ty!(r)), params![v], true);
    add("llRot2Fwd", Some(ty!(v)), params![r], true);
    add("llAxisAngle2Rot", Some(ty!(r)), params![v f], true);

    // Strings and lists.
    add("llStringLength", Some(ty!(i)), params![s], true);
    add("llGetSubString", Some(ty!(s)), params![s i i], true);
    add("llSubStringIndex", Some(ty!(i)), params![s s], true);
    add("llStringTrim", Some(ty!(s)), params![s i], true);
    add("llToUpper", Some(ty!(s)), params![s], true);
    add("llToLower", Some(ty!(s)), params![s], true);
    add("llInsertString", Some(ty!(s)), params![s i s], true);
    add("llDeleteSubString", Some(ty!(s)), params![s i i], true);
    add("llGetListLength", Some(ty!(i)), params![l], true);
    add("llDumpList2String", Some(ty!(s)), params![l s], true);
    add("llParseString2List", Some(ty!(l)), params![s l l], true);
    add("llParseStringKeepNulls", Some(ty!(l)), params![s l l], true);
    add("llCSV2List", Some(ty!(l)), params![s], true);
    add("llList2CSV", Some(ty!(s)), params![l], true);
    add("llList2List", Some(ty!(l)), params![l i i], true);
    add("llDeleteSubList", Some(ty!(l)), params![l i i], true);
    add("llListReplaceList", Some(ty!(l)), params![l l i i], true);
    add("llListInsertList", Some(ty!(l)), params![l l i], true);
    add("llListFindList", Some(ty!(i)), params![l l], true);
    add("llListSort", Some(ty!(l)), params![l i i], true);
    add("llGetListEntryType", Some(ty!(i)), params![l i], true);
    add("llList2Integer", Some(ty!(i)), params![l i], true);
    add("llList2Float", Some(ty!(f)), params![l i], true);
    add("llList2String", Some(ty!(s)), params![l i], true);
    add("llList2Key", Some(ty!(k)), params![l i], true);
    add("llList2Vector", Some(ty!(v)), params![l i], true);
    add("llList2Rot", Some(ty!(r)), params![l i], true);

    // Terminators.
    add("llResetScript", None, params![], false);
    add("llDie", None, params![], false);
    add("llResetOtherScript", None, params![s], false);

    for name in ["llResetScript", "llDie"] {
        fns.get_mut(name).unwrap().stop = true;
    }
    for (name, t) in [
        ("llList2Integer", Type::Integer),
        ("llList2Float", Type::Float),
        ("llList2String", Type::String),
        ("llList2Key", Type::Key),
        ("llList2Vector", Type::Vector),
        ("llList2Rot", Type::Rotation),
    ] {
        fns.get_mut(name).unwrap().list_to = Some(t);
    }
    fns
}

/// The builtin library table. Built once, shared for the process
/// lifetime.
pub fn builtin_library() -> &'static Library {
    static LIB: OnceLock<Library> = OnceLock::new();
    LIB.get_or_init(|| {
        Library {
            events: events(),
            constants: constants(),
            funcs: functions(),
            type_to_extraction: FxHashMap::default(),
        }
        .finish()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_are_consistent() {
        let lib = builtin_library();
        for (name, ev) in &lib.events {
            assert_eq!(
                ev.param_types.len(),
                ev.param_names.len(),
                "event {name} arity mismatch"
            );
        }
        assert!(lib.funcs["llResetScript"].stop);
        assert!(!lib.funcs["llOwnerSay"].sef);
        assert!(lib.funcs["llGetListLength"].sef);
    }

    #[test]
    fn extraction_map_covers_all_value_types_but_list() {
        let lib = builtin_library();
        for t in [
            Type::Integer,
            Type::Float,
            Type::String,
            Type::Key,
            Type::Vector,
            Type::Rotation,
        ] {
            assert_eq!(
                lib.type_to_extraction.get(&t).map(String::as_str),
                Some(match t {
                    Type::Integer => "llList2Integer",
                    Type::Float => "llList2Float",
                    Type::String => "llList2String",
                    Type::Key => "llList2Key",
                    Type::Vector => "llList2Vector",
                    Type::Rotation => "llList2Rot",
                    Type::List => unreachable!(),
                })
            );
        }
        assert!(!lib.type_to_extraction.contains_key(&Type::List));
    }

    #[test]
    fn object_details_table_matches_extraction_rules() {
        // OBJECT_NAME (1) is a string, OBJECT_POS (3) is a vector.
        assert_eq!(OBJ_DETAILS_TYPES.as_bytes()[1], b's');
        assert_eq!(OBJ_DETAILS_TYPES.as_bytes()[3], b'v');
        assert!(list_compat('s', 'v'));
        assert!(!list_compat('v', 's'));
        assert!(!list_compat('i', 'v'));
    }

    #[test]
    fn prim_params_arg_codes_are_not_foldable() {
        assert!(prim_param_takes_arg(18)); // PRIM_COLOR needs a face
        assert!(!prim_param_takes_arg(27)); // PRIM_NAME does not
        assert_eq!(PRIM_PARAMS_TYPES[27], Some("s"));
        assert_eq!(PRIM_PARAMS_TYPES[9], Some("i*"));
        assert_eq!(PRIM_PARAMS_TYPES[0], None);
    }
}
