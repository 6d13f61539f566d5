//! Value extraction and injection rules

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::host::FieldControl;

/// Field name → current string value
pub type FieldValueMap = BTreeMap<String, String>;

/// Value a single control contributes
///
/// Boolean-like controls yield their export value when active and an empty
/// string otherwise; everything else yields its raw value.
pub fn control_value(control: &dyn FieldControl) -> String {
    if control.kind().is_boolean_like() {
        if control.is_checked() {
            control.on_value()
        } else {
            String::new()
        }
    } else {
        control.value()
    }
}

/// Collect the value of every named control
///
/// When several boolean-like controls share a name (radio groups), the
/// active one wins and an inactive one never overwrites a value already
/// present.
pub fn collect_values(controls: &[Arc<dyn FieldControl>]) -> FieldValueMap {
    let mut values = FieldValueMap::new();
    for control in controls {
        let Some(name) = control.name() else {
            continue;
        };
        let value = control_value(control.as_ref());
        if control.kind().is_boolean_like() && value.is_empty() {
            values.entry(name).or_default();
        } else {
            values.insert(name, value);
        }
    }
    values
}

/// Push `value` into a control using the extraction rule in reverse
pub fn inject_value(control: &dyn FieldControl, value: &str) {
    if control.kind().is_boolean_like() {
        let on_value = control.on_value();
        let checked = !value.is_empty() && (value == on_value || value == "true");
        control.set_checked(checked);
    } else {
        control.set_value(value);
    }
}

/// Inject values into every control whose name has an entry
///
/// Controls without a matching entry are left alone. Returns the number of
/// controls written.
pub fn inject_values(controls: &[Arc<dyn FieldControl>], values: &FieldValueMap) -> usize {
    let mut written = 0;
    for control in controls {
        let Some(value) = control.name().and_then(|name| values.get(&name)) else {
            continue;
        };
        inject_value(control.as_ref(), value);
        written += 1;
    }
    written
}
