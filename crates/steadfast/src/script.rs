//! JavaScript snippets evaluated in the page.
//!
//! Every snippet is a self-contained expression. Element lookup picks the
//! first *visible* match of a selector, falling back to the first match.

use crate::locator::{js_str, Selector};
use crate::widget::{TargetState, WidgetKind};

const VISIBLE_FN: &str = "const visible = (e) => { const r = e.getBoundingClientRect(); \
     const s = window.getComputedStyle(e); \
     return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; };";

/// Wrap `body` so it runs with `el` bound to the picked element.
/// `missing` is returned when nothing matches.
fn with_element(selector: &Selector, missing: &str, body: &str) -> String {
    format!(
        "(() => {{ {VISIBLE_FN} const els = {all}; const el = els.find(visible) || els[0] || null; \
         if (!el) {{ return {missing}; }} {body} }})()",
        all = selector.to_all_query(),
    )
}

/// `{count, visible}` for a selector
#[must_use]
pub fn probe(selector: &Selector) -> String {
    format!(
        "(() => {{ {VISIBLE_FN} const els = {all}; return {{ count: els.length, visible: els.some(visible) }}; }})()",
        all = selector.to_all_query(),
    )
}

/// Current widget state: `{checked}` or `{selected}`, `null` when detached
#[must_use]
pub fn read_state(selector: &Selector, kind: &WidgetKind) -> String {
    let body = match kind {
        WidgetKind::Toggle | WidgetKind::Radio => {
            "const input = (el.matches('input') ? el : el.querySelector('input[type=checkbox],input[type=radio]')); \
             if (input) { return { checked: !!input.checked }; } \
             return { checked: el.getAttribute('aria-checked') === 'true' };"
        }
        WidgetKind::Select { .. } => {
            "if (el.matches('select')) { const o = el.selectedOptions[0]; return { selected: o ? o.textContent.trim() : null }; } \
             const shown = el.querySelector('.v-select__selection, [aria-selected=\"true\"]'); \
             if (shown && shown.textContent.trim()) { return { selected: shown.textContent.trim() }; } \
             const input = el.matches('input') ? el : el.querySelector('input:not([type=hidden])'); \
             const v = input ? input.value.trim() : ''; \
             return { selected: v === '' ? null : v };"
        }
    };
    with_element(selector, "null", body)
}

/// Set the underlying value directly and synthesize the change notifications.
///
/// Toggles also get a bare `Event('click')`: reactive frameworks listening
/// for clicks see it, but it does not trigger the browser's own checkbox
/// activation, so the value set here is not flipped back.
#[must_use]
pub fn dispatch_state(selector: &Selector, kind: &WidgetKind, target: &TargetState) -> String {
    let fire = "const fire = (t, type) => t.dispatchEvent(new Event(type, { bubbles: true }));";
    let body = match (kind, target) {
        (WidgetKind::Toggle | WidgetKind::Radio, TargetState::Checked(want)) => {
            let click = if matches!(kind, WidgetKind::Toggle) {
                "fire(input, 'click');"
            } else {
                ""
            };
            format!(
                "{fire} const input = (el.matches('input') ? el : el.querySelector('input')) || el; \
                 input.checked = {want}; \
                 if (input !== el && el.hasAttribute('aria-checked')) {{ el.setAttribute('aria-checked', '{want}'); }} \
                 fire(input, 'change'); fire(input, 'input'); {click} return true;"
            )
        }
        (WidgetKind::Select { options_css }, TargetState::Option(label)) => format!(
            "{fire} const label = {label}.trim().toLowerCase(); \
             if (el.matches('select')) {{ \
               const opt = Array.from(el.options).find(o => o.textContent.trim().toLowerCase() === label); \
               if (!opt) {{ return false; }} \
               el.value = opt.value; fire(el, 'input'); fire(el, 'change'); return true; }} \
             const find = () => Array.from(document.querySelectorAll({options})).find(o => o.textContent.trim().toLowerCase() === label); \
             let opt = find(); \
             if (!opt) {{ (el.querySelector('[role=button], .v-select__slot') || el).dispatchEvent(new MouseEvent('click', {{ bubbles: true }})); }} \
             return new Promise((resolve) => {{ let n = 0; const tick = () => {{ opt = find(); \
               if (opt) {{ opt.dispatchEvent(new MouseEvent('mousedown', {{ bubbles: true }})); \
                 opt.dispatchEvent(new MouseEvent('click', {{ bubbles: true }})); resolve(true); }} \
               else if (n++ > 20) {{ resolve(false); }} else {{ setTimeout(tick, 50); }} }}; tick(); }});",
            label = js_str(label),
            options = js_str(options_css),
        ),
        _ => "return false;".to_string(),
    };
    with_element(selector, "false", &body)
}

/// Replace an input's value and notify listeners; `false` when missing
#[must_use]
pub fn fill(selector: &Selector, text: &str) -> String {
    let body = format!(
        "el.focus(); \
         const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
         const setter = Object.getOwnPropertyDescriptor(proto, 'value').set; \
         setter.call(el, {text}); \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
         return true;",
        text = js_str(text),
    );
    with_element(selector, "false", &body)
}

/// Input value, `null` when missing
#[must_use]
pub fn input_value(selector: &Selector) -> String {
    with_element(
        selector,
        "null",
        "return 'value' in el ? String(el.value) : null;",
    )
}

/// Rendered text, `null` when missing
#[must_use]
pub fn text_content(selector: &Selector) -> String {
    with_element(
        selector,
        "null",
        "return (el.innerText || el.textContent || '').trim();",
    )
}

/// Rendered text of every match
#[must_use]
pub fn all_text_contents(selector: &Selector) -> String {
    format!(
        "{all}.map(el => (el.innerText || el.textContent || '').trim())",
        all = selector.to_all_query()
    )
}

/// Actionability report used before delivering pointer events.
///
/// Returns `{status, left, top, width, height}` where status is one of
/// `ok`, `missing`, `hidden`, `disabled`, `obscured`. With `forced` only
/// `missing` is reported.
#[must_use]
pub fn actionability(selector: &Selector, forced: bool) -> String {
    let body = format!(
        "el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
         const r = el.getBoundingClientRect(); \
         const geo = {{ left: r.left, top: r.top, width: r.width, height: r.height }}; \
         if ({forced}) {{ return {{ status: 'ok', ...geo }}; }} \
         if (!visible(el)) {{ return {{ status: 'hidden', ...geo }}; }} \
         if (el.disabled || el.getAttribute('aria-disabled') === 'true') {{ return {{ status: 'disabled', ...geo }}; }} \
         const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
         const owns = hit && (hit === el || el.contains(hit) || hit.contains(el) || (hit.control && hit.control === el)); \
         if (!owns || window.getComputedStyle(el).pointerEvents === 'none') {{ \
           return {{ status: 'obscured', by: hit ? (hit.className || hit.tagName) : null, ...geo }}; }} \
         return {{ status: 'ok', ...geo }};"
    );
    with_element(selector, "{ status: 'missing' }", &body)
}
