// Path: crates/drivers/src/adb/dumpsys.rs
//! Parsers over `dumpsys` / `wm` text output. OEMs vary the exact field
//! names, so each parser accepts the known variants.

use autotap_api::ports::LockStatus;

/// `dumpsys power`: true when the device reports an interactive display.
pub fn parse_interactive(output: &str) -> bool {
    output.contains("mWakefulness=Awake")
        || output.contains("Display Power: state=ON")
        || output.contains("mScreenOn=true")
}

/// `dumpsys window policy`: keyguard visibility and whether a credential
/// guards it.
pub fn parse_lock_status(output: &str) -> LockStatus {
    let showing = ["mKeyguardShowing=true", "keyguardShowing=true", "mShowingLockscreen=true"]
        .iter()
        .any(|t| output.contains(t));
    if !showing {
        return LockStatus::Unlocked;
    }
    let secured = ["mKeyguardSecure=true", "mIsSecure=true", "mInputRestricted=true"]
        .iter()
        .any(|t| output.contains(t));
    LockStatus::Locked { secured }
}

/// `dumpsys activity activities`: resolves the resumed task's component.
/// Returns (package, activity).
pub fn parse_foreground(output: &str) -> Option<(String, Option<String>)> {
    let line = output
        .lines()
        .find(|l| l.contains("topResumedActivity") || l.contains("mResumedActivity"))?;

    // The component is the only token containing '/', e.g.
    // "com.example.app/.MainActivity" or "com.example.app/com.example.app.MainActivity".
    let component = line
        .split_whitespace()
        .find(|tok| tok.contains('/') && !tok.starts_with('/'))?;
    let component = component.trim_end_matches('}');

    let (package, activity) = component.split_once('/')?;
    let activity = if activity.is_empty() {
        None
    } else if let Some(short) = activity.strip_prefix('.') {
        Some(format!("{}.{}", package, short))
    } else {
        Some(activity.to_string())
    };
    Some((package.to_string(), activity))
}

/// `wm size`: "Override size" wins over "Physical size" when present.
pub fn parse_screen_size(output: &str) -> Option<(u32, u32)> {
    let pick = |label: &str| {
        output
            .lines()
            .find(|l| l.contains(label))
            .and_then(|l| l.split(':').nth(1))
            .and_then(|dims| {
                let (w, h) = dims.trim().split_once('x')?;
                Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
            })
    };
    pick("Override size").or_else(|| pick("Physical size"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_from_wakefulness_and_display_state() {
        assert!(parse_interactive("POWER MANAGER\n  mWakefulness=Awake\n"));
        assert!(parse_interactive("Display Power: state=ON"));
        assert!(!parse_interactive("mWakefulness=Asleep\nDisplay Power: state=OFF"));
    }

    #[test]
    fn lock_status_variants() {
        assert_eq!(parse_lock_status("mKeyguardShowing=false"), LockStatus::Unlocked);
        assert_eq!(
            parse_lock_status("keyguardShowing=true mKeyguardSecure=false"),
            LockStatus::Locked { secured: false }
        );
        assert_eq!(
            parse_lock_status("mKeyguardShowing=true\n mKeyguardSecure=true"),
            LockStatus::Locked { secured: true }
        );
    }

    #[test]
    fn foreground_from_resumed_activity_line() {
        let out = "  mResumedActivity: ActivityRecord{1db3f5 u0 com.zhiliaoapp.musically/.MainActivity t42}";
        let (pkg, activity) = parse_foreground(out).unwrap();
        assert_eq!(pkg, "com.zhiliaoapp.musically");
        assert_eq!(
            activity.as_deref(),
            Some("com.zhiliaoapp.musically.MainActivity")
        );
    }

    #[test]
    fn foreground_from_top_resumed_with_full_class() {
        let out = "topResumedActivity=ActivityRecord{af1 u0 com.example/com.example.ui.Feed t7}";
        let (pkg, activity) = parse_foreground(out).unwrap();
        assert_eq!(pkg, "com.example");
        assert_eq!(activity.as_deref(), Some("com.example.ui.Feed"));
    }

    #[test]
    fn foreground_absent() {
        assert!(parse_foreground("nothing resumed here").is_none());
    }

    #[test]
    fn screen_size_prefers_override() {
        let out = "Physical size: 1080x2400\nOverride size: 1080x1920\n";
        assert_eq!(parse_screen_size(out), Some((1080, 1920)));
        assert_eq!(parse_screen_size("Physical size: 720x1280"), Some((720, 1280)));
        assert_eq!(parse_screen_size("garbage"), None);
    }
}
