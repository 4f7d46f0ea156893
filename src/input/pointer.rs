//! Current pointer position from the OS
//!
//! The hook only reports the pointer when it moves, so a recording that starts
//! with a click needs the position the pointer was already at.

/// Screen position of the pointer, `None` when the platform cannot tell
pub fn pointer_position() -> Option<(i32, i32)> {
    #[cfg(target_os = "macos")]
    {
        pointer_position_macos()
    }

    #[cfg(target_os = "linux")]
    {
        pointer_position_x11()
    }

    #[cfg(target_os = "windows")]
    {
        pointer_position_windows()
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

// ============================================================================
// macOS
// ============================================================================

#[cfg(target_os = "macos")]
#[repr(C)]
#[derive(Clone, Copy)]
struct CGPoint {
    x: f64,
    y: f64,
}

#[cfg(target_os = "macos")]
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventCreate(source: *const std::ffi::c_void) -> *mut std::ffi::c_void;
    fn CGEventGetLocation(event: *const std::ffi::c_void) -> CGPoint;
}

#[cfg(target_os = "macos")]
#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFRelease(cf: *const std::ffi::c_void);
}

#[cfg(target_os = "macos")]
fn pointer_position_macos() -> Option<(i32, i32)> {
    unsafe {
        // A null-source event carries the current pointer location
        let event = CGEventCreate(std::ptr::null());
        if event.is_null() {
            return None;
        }
        let location = CGEventGetLocation(event);
        CFRelease(event);
        Some((location.x as i32, location.y as i32))
    }
}

// ============================================================================
// Linux (X11 via xdotool)
// ============================================================================

#[cfg(target_os = "linux")]
fn pointer_position_x11() -> Option<(i32, i32)> {
    use std::process::Command;

    let output = Command::new("xdotool")
        .args(["getmouselocation", "--shell"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_mouse_location(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the `X=`/`Y=` lines of `xdotool getmouselocation --shell`
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_mouse_location(output: &str) -> Option<(i32, i32)> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("X", value)) => x = value.parse().ok(),
            Some(("Y", value)) => y = value.parse().ok(),
            _ => {}
        }
    }
    Some((x?, y?))
}

// ============================================================================
// Windows
// ============================================================================

#[cfg(target_os = "windows")]
fn pointer_position_windows() -> Option<(i32, i32)> {
    use windows::Win32::Foundation::POINT;
    use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

    let mut point = POINT::default();
    unsafe { GetCursorPos(&mut point) }.ok()?;
    Some((point.x, point.y))
}
