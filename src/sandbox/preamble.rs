//! JavaScript preamble injected ahead of user scripts.
//!
//! The capability object is assembled as plain JS source and evaluated
//! together with the user script as one program. Dynamic pieces (the variable
//! snapshot, the response snapshot, and the `pm.sendRequest` wiring) are
//! spliced in as JSON literals, so no host callbacks cross the engine
//! boundary during evaluation.

/// Shared capability surface. `__ENV_JSON__`, `__RESPONSE_JS__`, and
/// `__SEND_REQUEST_JS__` are replaced before evaluation.
const CAPABILITY_TEMPLATE: &str = r#"
var __console = [];
var __updates = {};
var console = {
  log: function () {
    __console.push(Array.prototype.slice.call(arguments)
      .map(function (a) { return typeof a === 'object' ? JSON.stringify(a) : String(a); })
      .join(' '));
  }
};
var pm = {
  environment: {
    _vars: __ENV_JSON__,
    get: function (key) { return this._vars[key] !== undefined ? this._vars[key] : null; },
    set: function (key, value) {
      this._vars[key] = String(value);
      __updates[key] = String(value);
    }
  },
  response: (function () {
    var raw = __RESPONSE_JS__;
    if (!raw) return undefined;
    return {
      status: raw.status,
      statusCode: raw.status,
      headers: raw.headers,
      text: function () { return raw.body_text || ''; },
      json: function () { return raw.body_json !== undefined ? raw.body_json : null; }
    };
  })(),
  sendRequest: __SEND_REQUEST_JS__,
  require: function (name) {
    __console.push('[warn] pm.require("' + name + '") is not supported; returning an empty module');
    return {};
  },
  execution: {
    runRequest: function (id) {
      __console.push('[warn] pm.execution.runRequest("' + id + '") is not supported');
      return { body: {} };
    }
  }
};
"#;

/// Probe-phase `pm.sendRequest`: performs no I/O, records the arguments of
/// the most recent invocation, and returns an immediate zero-value response.
pub(crate) const MOCK_SEND_REQUEST: &str = r#"
(function () {
  var __captured = null;
  var send = function (options) {
    __captured = options;
    return {
      status: 0, statusCode: 0,
      headers: {},
      text: function () { return ''; },
      // An empty object rather than null: probe-phase scripts routinely
      // dereference fields of the (fake) body before the replay run.
      json: function () { return {}; }
    };
  };
  send.__captured = function () { return __captured; };
  return send;
})()
"#;

/// Probe-phase program suffix: serializes the phase result together with the
/// captured `pm.sendRequest` arguments, guarding against scripts that
/// reassign `pm.sendRequest`.
pub(crate) const PROBE_SUFFIX: &str = r#"
var __report = JSON.stringify({ updates: __updates, console: __console });
JSON.stringify({
  result: JSON.parse(__report),
  captured: (pm.sendRequest && pm.sendRequest.__captured) ? pm.sendRequest.__captured() : null
});
"#;

/// Replay-phase program suffix: serializes the phase result only.
pub(crate) const REPLAY_SUFFIX: &str = r#"
JSON.stringify({ updates: __updates, console: __console });
"#;

/// Replay-phase `pm.sendRequest`: unconditionally returns the captured real
/// response, regardless of the arguments supplied on the second run.
pub(crate) fn real_send_request(response_json: &str) -> String {
    const TEMPLATE: &str = r#"
(function () {
  var bridged = __BRIDGE_JSON__;
  return function () {
    return {
      status: bridged.status, statusCode: bridged.status,
      headers: bridged.headers,
      text: function () { return bridged.body_text || ''; },
      json: function () { return bridged.body_json !== undefined ? bridged.body_json : null; }
    };
  };
})()
"#;
    TEMPLATE.replace("__BRIDGE_JSON__", response_json)
}

/// Assembles the full program for one evaluation phase.
pub(crate) fn build_program(
    env_json: &str,
    response_js: &str,
    send_request_js: &str,
    script: &str,
    suffix: &str,
) -> String {
    let preamble = CAPABILITY_TEMPLATE
        .replace("__ENV_JSON__", env_json)
        .replace("__RESPONSE_JS__", response_js)
        .replace("__SEND_REQUEST_JS__", send_request_js);
    format!("{}\n{}\n{}", preamble, script, suffix)
}
