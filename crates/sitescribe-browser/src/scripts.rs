//! JavaScript evaluated in the page by [`crate::ChromiumPage`].
//!
//! Every script returns a `{status, value}` envelope so stale handles and
//! selector syntax errors come back as data instead of CDP exceptions.
//! Handles are numeric stamps stored in `data-sitescribe-id`; the high bits
//! carry a per-document token so handles from a replaced document never
//! resolve.

const TEMPLATE: &str = r#"(() => {
  const S = window.__sitescribe || (window.__sitescribe = (() => {
    const BASE = 4294967296;
    const doc = Math.floor(Math.random() * 1048576) + 1;
    let next = 1;
    const attrsOf = (el) => {
      const attrs = {};
      for (const a of el.attributes) {
        if (a.name !== 'data-sitescribe-id') attrs[a.name] = a.value;
      }
      return attrs;
    };
    const shown = (el) => {
      const s = el.ownerDocument.defaultView.getComputedStyle(el);
      return s.display !== 'none' && s.visibility !== 'hidden';
    };
    const snap = (n) => {
      if (n.nodeType === Node.TEXT_NODE) return { kind: 'text', text: n.textContent };
      if (n.nodeType !== Node.ELEMENT_NODE) return null;
      return {
        kind: 'element',
        tag: n.tagName.toLowerCase(),
        attrs: attrsOf(n),
        visible: shown(n),
        children: Array.from(n.childNodes).map(snap).filter(Boolean),
      };
    };
    return {
      stamp(el) {
        if (!el.dataset.sitescribeId) el.dataset.sitescribeId = String(doc * BASE + next++);
        return Number(el.dataset.sitescribeId);
      },
      find(id) {
        if (Math.floor(id / BASE) !== doc) return null;
        return document.querySelector(`[data-sitescribe-id="${id}"]`);
      },
      attrsOf,
      shown,
      snap,
    };
  })());
  const ok = (value) => ({ status: 'ok', value: value === undefined ? null : value });
  const stale = { status: 'stale' };
  try {
    __BODY__
  } catch (e) {
    if (e && e.name === 'SyntaxError') return { status: 'invalid', message: String(e.message) };
    throw e;
  }
})()"#;

fn wrap(body: &str) -> String {
    TEMPLATE.replace("__BODY__", body)
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn with_element(id: u64, body: &str) -> String {
    wrap(&format!(
        "const el = S.find({id}); if (!el) return stale; {body}"
    ))
}

pub(crate) fn location() -> String {
    wrap("return ok(location.href);")
}

pub(crate) fn push_location(url: &str, event: Option<&str>) -> String {
    let url = js_string(url);
    let dispatch = match event {
        Some("popstate") => "window.dispatchEvent(new PopStateEvent('popstate', { state: {} }));",
        Some("hashchange") => {
            "window.dispatchEvent(new HashChangeEvent('hashchange', { oldURL: old, newURL: location.href }));"
        }
        _ => "",
    };
    wrap(&format!(
        "const old = location.href; history.pushState({{}}, '', {url}); {dispatch} return ok(null);"
    ))
}

pub(crate) fn query_all(selector: &str) -> String {
    let selector = js_string(selector);
    wrap(&format!(
        "return ok(Array.from(document.querySelectorAll({selector})).map((e) => S.stamp(e)));"
    ))
}

pub(crate) fn query_within(scope: u64, selector: &str) -> String {
    let selector = js_string(selector);
    with_element(
        scope,
        &format!("return ok(Array.from(el.querySelectorAll({selector})).map((e) => S.stamp(e)));"),
    )
}

pub(crate) fn closest(id: u64, selector: &str) -> String {
    let selector = js_string(selector);
    with_element(
        id,
        &format!("const c = el.closest({selector}); return ok(c ? S.stamp(c) : null);"),
    )
}

pub(crate) fn contains(outer: u64, inner: u64) -> String {
    wrap(&format!(
        "const a = S.find({outer}); const b = S.find({inner}); \
         if (!a || !b) return stale; return ok(a.contains(b));"
    ))
}

pub(crate) fn describe(id: u64) -> String {
    with_element(
        id,
        "return ok({ tag: el.tagName.toLowerCase(), attrs: S.attrsOf(el), text: (el.textContent || '').trim() });",
    )
}

pub(crate) fn inner_markup(id: u64) -> String {
    with_element(id, "return ok(el.innerHTML);")
}

pub(crate) fn ancestor_tags(id: u64) -> String {
    with_element(
        id,
        "const tags = []; let p = el.parentElement; \
         while (p) { tags.push(p.tagName.toLowerCase()); p = p.parentElement; } return ok(tags);",
    )
}

pub(crate) fn is_visible(id: u64) -> String {
    with_element(
        id,
        "let n = el; while (n) { if (!S.shown(n)) return ok(false); n = n.parentElement; } return ok(true);",
    )
}

pub(crate) fn scroll_into_view(id: u64) -> String {
    with_element(
        id,
        "el.scrollIntoView({ behavior: 'instant', block: 'center' }); return ok(null);",
    )
}

pub(crate) fn activate(id: u64) -> String {
    with_element(id, "el.click(); return ok(null);")
}

pub(crate) fn dispatch_input(id: u64, event_type: &str, key: Option<&str>) -> String {
    let event_type = js_string(event_type);
    let body = match key {
        Some(key) => {
            let code = if key == " " { "Space" } else { key };
            let key = js_string(key);
            let code = js_string(code);
            format!(
                "el.focus(); el.dispatchEvent(new KeyboardEvent({event_type}, \
                 {{ key: {key}, code: {code}, bubbles: true, cancelable: true }})); return ok(null);"
            )
        }
        None => format!(
            "const Ctor = {event_type}.startsWith('pointer') ? PointerEvent : MouseEvent; \
             el.dispatchEvent(new Ctor({event_type}, {{ view: window, bubbles: true, cancelable: true }})); \
             return ok(null);"
        ),
    };
    with_element(id, &body)
}

pub(crate) fn snapshot(id: u64) -> String {
    with_element(id, "return ok(S.snap(el));")
}

pub(crate) fn frames() -> String {
    wrap(
        "return ok(Array.from(document.querySelectorAll('iframe')).map((f) => { \
           let d = null; try { d = f.contentDocument; } catch (e) { d = null; } \
           if (d && d.body) return { access: 'accessible', src: f.src || null, body: S.snap(d.body) }; \
           return f.src ? { access: 'restricted', src: f.src } : null; \
         }).filter(Boolean));",
    )
}

pub(crate) fn scroll_metrics() -> String {
    wrap(
        "return ok({ scrollHeight: document.body ? document.body.scrollHeight : 0, \
         viewportHeight: window.innerHeight });",
    )
}

pub(crate) fn scroll_to(y: u64) -> String {
    wrap(&format!("window.scrollTo(0, {y}); return ok(null);"))
}

pub(crate) fn runtime_hints() -> String {
    wrap(
        "return ok({ historyApi: typeof history.pushState === 'function', \
         frameworkGlobals: !!(window.React || window.Vue || window.Angular) });",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_are_embedded_as_js_strings() {
        let script = query_all(r#"a[href*="/reference/"]"#);
        assert!(script.contains(r#"document.querySelectorAll("a[href*=\"/reference/\"]")"#));
        assert!(!script.contains("__BODY__"));
    }

    #[test]
    fn test_keyboard_dispatch_uses_code() {
        let script = dispatch_input(7, "keydown", Some(" "));
        assert!(script.contains(r#"code: "Space""#));
        assert!(script.contains("S.find(7)"));
    }

    #[test]
    fn test_popstate_location_change() {
        let script = push_location("/reference/get-invoice", Some("popstate"));
        assert!(script.contains("PopStateEvent"));
        assert!(script.contains(r#"history.pushState({}, '', "/reference/get-invoice")"#));
    }
}
