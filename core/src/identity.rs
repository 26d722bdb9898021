//! Host user identity, passed to dependent builds so files created inside
//! the image can match the invoking user's ownership.

use serde::Serialize;

pub const USERNAME_ARG: &str = "USERNAME";
pub const USER_ID_ARG: &str = "USER_ID";
pub const GROUP_ID_ARG: &str = "GROUP_ID";

/// Login name and numeric ids of the invoking user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostIdentity {
    pub user_name: String,
    pub uid: u32,
    pub gid: u32,
}

impl HostIdentity {
    pub fn new(user_name: impl Into<String>, uid: u32, gid: u32) -> Self {
        Self {
            user_name: user_name.into(),
            uid,
            gid,
        }
    }

    /// Identity of the current process.
    #[cfg(unix)]
    pub fn current() -> Self {
        // SAFETY: getuid/getgid cannot fail and touch no memory.
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        let user_name = std::env::var("USER")
            .ok()
            .filter(|u| !u.is_empty())
            .or_else(|| passwd_name(uid))
            .unwrap_or_else(|| uid.to_string());
        Self::new(user_name, uid, gid)
    }

    #[cfg(not(unix))]
    pub fn current() -> Self {
        let user_name = std::env::var("USERNAME").unwrap_or_else(|_| "user".to_string());
        tracing::warn!(
            user = %user_name,
            "Host uid/gid unavailable on this platform, using 1000:1000"
        );
        Self::new(user_name, 1000, 1000)
    }

    /// `USERNAME`, `USER_ID`, `GROUP_ID` build args.
    pub fn build_args(&self) -> [(&'static str, String); 3] {
        [
            (USERNAME_ARG, self.user_name.clone()),
            (USER_ID_ARG, self.uid.to_string()),
            (GROUP_ID_ARG, self.gid.to_string()),
        ]
    }
}

#[cfg(unix)]
fn passwd_name(uid: libc::uid_t) -> Option<String> {
    // SAFETY: getpwuid returns null or a pointer to static storage that
    // stays valid until the next getpw* call; the name is copied out at once.
    unsafe {
        let pw = libc::getpwuid(uid);
        if pw.is_null() || (*pw).pw_name.is_null() {
            return None;
        }
        std::ffi::CStr::from_ptr((*pw).pw_name)
            .to_str()
            .ok()
            .map(str::to_string)
    }
}
