//! Actions driven against the game page.
//!
//! Two kinds exist: direct invocation of a page-global hook (deterministic,
//! preferred) and synthetic input (pointer, keyboard, or DOM mutation plus
//! synthetic events) for surfaces without hooks. Actions return nothing;
//! their effects are observed out-of-band through the log buffer and DOM.

use serde_json::Value;

/// One UI action to drive.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Invoke an exposed page-global function with an array-wrapped
    /// argument list, e.g. `window.changeSfxVolume([0.8])`.
    CallHook {
        /// Global function name (without the `window.` prefix)
        name: String,
        /// Arguments, wrapped in a single array on the wire
        args: Vec<Value>,
    },
    /// Click a DOM-overlay element by id.
    ClickId {
        /// Element id (without `#`)
        id: String,
    },
    /// Click at absolute page coordinates.
    ClickAt {
        /// X in page pixels
        x: f64,
        /// Y in page pixels
        y: f64,
    },
    /// Click a canvas-rendered control through the coordinate table.
    ClickElement {
        /// Logical control name in the table
        name: String,
    },
    /// Press a keyboard key (e.g. "Space").
    PressKey {
        /// Key name
        key: String,
    },
    /// Set a range input's value and dispatch `input` + `change`.
    SetRangeValue {
        /// Element id (without `#`)
        id: String,
        /// New value
        value: f64,
    },
    /// Set a checkbox's checked state and dispatch `change`.
    SetChecked {
        /// Element id (without `#`)
        id: String,
        /// New checked state
        checked: bool,
    },
}

impl Action {
    /// Hook invocation with arguments.
    #[must_use]
    pub fn call_hook(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::CallHook {
            name: name.into(),
            args,
        }
    }

    /// Short description for trace output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CallHook { name, args } => format!("call {name}({})", args_json(args)),
            Self::ClickId { id } => format!("click #{id}"),
            Self::ClickAt { x, y } => format!("click at ({x}, {y})"),
            Self::ClickElement { name } => format!("click element '{name}'"),
            Self::PressKey { key } => format!("press {key}"),
            Self::SetRangeValue { id, value } => format!("set #{id} = {value}"),
            Self::SetChecked { id, checked } => format!("set #{id} checked = {checked}"),
        }
    }
}

fn args_json(args: &[Value]) -> String {
    serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string())
}

/// Script invoking a page-global hook: `window.NAME([...args])`.
#[must_use]
pub fn hook_call_script(name: &str, args: &[Value]) -> String {
    format!("window.{name}({})", args_json(args))
}

/// Script testing whether a hook has been installed yet.
#[must_use]
pub fn hook_defined_script(name: &str) -> String {
    format!("window.{name} !== undefined")
}

/// Script clicking an overlay element by id.
#[must_use]
pub fn click_id_script(id: &str) -> String {
    format!("document.getElementById('{id}').click()")
}

/// Script setting a range input and firing synthetic events.
#[must_use]
pub fn set_range_script(id: &str, value: f64) -> String {
    format!(
        "const el = document.getElementById('{id}'); \
         el.value = {value}; \
         el.dispatchEvent(new Event('input')); \
         el.dispatchEvent(new Event('change'));"
    )
}

/// Script setting a checkbox and firing a synthetic change event.
#[must_use]
pub fn set_checked_script(id: &str, checked: bool) -> String {
    format!(
        "const el = document.getElementById('{id}'); \
         el.checked = {checked}; \
         el.dispatchEvent(new Event('change'));"
    )
}

/// Script reading an input's `value` attribute as a string.
#[must_use]
pub fn element_value_script(id: &str) -> String {
    format!("document.getElementById('{id}').value")
}

/// Script reading a checkbox's `checked` attribute.
#[must_use]
pub fn element_checked_script(id: &str) -> String {
    format!("document.getElementById('{id}').checked")
}

/// Script checking element visibility and interactivity.
///
/// An element counts as visible when it exists and its computed style has
/// `display != none`, `opacity != 0` and `pointer-events != none`.
#[must_use]
pub fn element_visible_script(id: &str) -> String {
    format!(
        "(() => {{ const el = document.getElementById('{id}'); \
         if (!el) return false; \
         const style = window.getComputedStyle(el); \
         return style.display !== 'none' \
             && style.opacity !== '0' \
             && style.pointerEvents !== 'none'; }})()"
    )
}

/// Script returning the canvas bounding box as a JSON object.
#[must_use]
pub fn canvas_box_script() -> String {
    "(() => { const el = document.querySelector('canvas'); \
     if (!el) return null; \
     const r = el.getBoundingClientRect(); \
     return { x: r.x, y: r.y, width: r.width, height: r.height }; })()"
        .to_string()
}
