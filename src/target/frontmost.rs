//! Frontmost application detection

/// The application owning the focused window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Process or localized application name
    pub name: String,
    pub pid: u32,
    /// Title of the focused window, where the platform exposes it
    pub window_title: Option<String>,
}

/// Get information about the currently focused application.
///
/// `None` when it cannot be determined (Wayland, missing xdotool, no session).
pub fn frontmost_app() -> Option<AppInfo> {
    #[cfg(target_os = "macos")]
    {
        frontmost_app_macos()
    }

    #[cfg(target_os = "linux")]
    {
        frontmost_app_x11()
    }

    #[cfg(target_os = "windows")]
    {
        frontmost_app_windows()
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
#[link(name = "AppKit", kind = "framework")]
extern "C" {}

#[cfg(target_os = "macos")]
fn frontmost_app_macos() -> Option<AppInfo> {
    use objc::runtime::Object;
    use objc::{class, msg_send, sel, sel_impl};

    unsafe {
        let workspace: *mut Object = msg_send![class!(NSWorkspace), sharedWorkspace];
        if workspace.is_null() {
            return None;
        }

        let app: *mut Object = msg_send![workspace, frontmostApplication];
        if app.is_null() {
            return None;
        }

        let localized: *mut Object = msg_send![app, localizedName];
        let name = match nsstring_to_string(localized) {
            Some(name) => name,
            None => {
                let bundle_id: *mut Object = msg_send![app, bundleIdentifier];
                nsstring_to_string(bundle_id)?
            }
        };
        let pid: i32 = msg_send![app, processIdentifier];

        // Window titles need the accessibility API; the app name is enough to gate on
        Some(AppInfo {
            name,
            pid: pid as u32,
            window_title: None,
        })
    }
}

#[cfg(target_os = "macos")]
unsafe fn nsstring_to_string(nsstring: *mut objc::runtime::Object) -> Option<String> {
    use objc::{msg_send, sel, sel_impl};
    use std::ffi::CStr;
    use std::os::raw::c_char;

    if nsstring.is_null() {
        return None;
    }

    let utf8: *const c_char = msg_send![nsstring, UTF8String];
    if utf8.is_null() {
        return None;
    }

    CStr::from_ptr(utf8).to_str().ok().map(str::to_string)
}

// ============================================================================
// Linux (X11 via xdotool)
// ============================================================================

#[cfg(target_os = "linux")]
fn xdotool(query: &str) -> Option<String> {
    use std::process::Command;

    let output = Command::new("xdotool")
        .args(["getactivewindow", query])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(target_os = "linux")]
fn frontmost_app_x11() -> Option<AppInfo> {
    let pid: u32 = xdotool("getwindowpid")?.parse().ok()?;

    let name = std::fs::read_to_string(format!("/proc/{}/comm", pid))
        .ok()?
        .trim()
        .to_string();

    let window_title = xdotool("getwindowname").filter(|title| !title.is_empty());

    Some(AppInfo {
        name,
        pid,
        window_title,
    })
}

// ============================================================================
// Windows
// ============================================================================

#[cfg(target_os = "windows")]
fn frontmost_app_windows() -> Option<AppInfo> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use windows::core::PWSTR;
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId,
    };

    unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.0.is_null() {
            return None;
        }

        let mut pid: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut pid as *mut u32));
        if pid == 0 {
            return None;
        }

        let mut title = [0u16; 512];
        let len = GetWindowTextW(hwnd, &mut title);
        let window_title = (len > 0)
            .then(|| OsString::from_wide(&title[..len as usize]).to_string_lossy().into_owned());

        let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;

        let mut buffer = [0u16; 1024];
        let mut size = buffer.len() as u32;
        let result = QueryFullProcessImageNameW(
            process,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        );
        let _ = CloseHandle(process);
        result.ok()?;

        let path = OsString::from_wide(&buffer[..size as usize]);
        let name = std::path::Path::new(&path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();

        Some(AppInfo {
            name,
            pid,
            window_title,
        })
    }
}
