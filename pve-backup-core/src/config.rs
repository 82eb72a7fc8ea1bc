use crate::constants::{api, config};
use crate::error::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// 凭据配置文件结构
///
/// ```toml
/// [global]
/// host = "pve.example.com"
/// user = "monitoring@pve"
/// password = "secret"
/// # port = 8006
/// # verify_ssl = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub global: GlobalSection,
}

/// `[global]` 段
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GlobalSection {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub verify_ssl: Option<bool>,
}

impl fmt::Debug for GlobalSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalSection")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("port", &self.port)
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

/// Proxmox VE 连接参数
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub verify_ssl: bool,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

impl ConnectionConfig {
    /// 从 TOML 配置文件加载，`[global]` 段必须包含 host、user、password
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProbeError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        tracing::debug!("已加载配置文件: {}", path.display());

        let section = file.global;
        let missing = |key: &str| {
            ProbeError::missing(format!(
                "配置文件 [{}] 段缺少 {}",
                config::GLOBAL_SECTION,
                key
            ))
        };
        Ok(Self {
            host: non_empty(section.host).ok_or_else(|| missing("host"))?,
            user: non_empty(section.user).ok_or_else(|| missing("user"))?,
            password: non_empty(section.password).ok_or_else(|| missing("password"))?,
            port: section.port.unwrap_or(api::DEFAULT_PORT),
            verify_ssl: section.verify_ssl.unwrap_or(false),
        })
    }

    /// 从命令行参数组装，缺少的参数给出对应的选项提示
    pub fn from_args(
        host: Option<String>,
        user: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let user = non_empty(user).ok_or_else(|| ProbeError::missing("没有提供用户名，请使用 -u"))?;
        let password =
            non_empty(password).ok_or_else(|| ProbeError::missing("没有提供密码，请使用 -p"))?;
        let host = non_empty(host).ok_or_else(|| ProbeError::missing("没有提供主机，请使用 -s"))?;
        Ok(Self {
            host,
            user,
            password,
            port: api::DEFAULT_PORT,
            verify_ssl: false,
        })
    }

    /// API 基础地址，例如 `https://pve.example.com:8006/api2/json`
    ///
    /// host 已经带协议时原样使用（不再追加端口）。
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}{}", host, api::PATH_PREFIX)
        } else {
            format!("https://{}:{}{}", host, self.port, api::PATH_PREFIX)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pve.toml");
        fs::write(
            &path,
            r#"
[global]
host = "pve.example.com"
user = "monitoring@pve"
password = "secret"
"#,
        )
        .unwrap();

        let config = ConnectionConfig::load_from_file(&path).unwrap();
        assert_eq!(config.user, "monitoring@pve");
        assert_eq!(config.port, 8006);
        assert!(!config.verify_ssl);
        assert_eq!(config.base_url(), "https://pve.example.com:8006/api2/json");
    }

    #[test]
    fn test_load_with_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pve.toml");
        fs::write(
            &path,
            "[global]\nhost = \"10.0.0.5\"\nuser = \"root@pam\"\npassword = \"pw\"\nport = 443\nverify_ssl = true\n",
        )
        .unwrap();

        let config = ConnectionConfig::load_from_file(&path).unwrap();
        assert!(config.verify_ssl);
        assert_eq!(config.base_url(), "https://10.0.0.5:443/api2/json");
    }

    #[test]
    fn test_missing_field_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pve.toml");
        fs::write(&path, "[global]\nhost = \"pve\"\nuser = \"root@pam\"\n").unwrap();

        let err = ConnectionConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ProbeError::MissingSetting(_)));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_invalid_or_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[global\nhost = ").unwrap();
        assert!(matches!(
            ConnectionConfig::load_from_file(&path),
            Err(ProbeError::Config(_))
        ));
        assert!(matches!(
            ConnectionConfig::load_from_file(dir.path().join("none.toml")),
            Err(ProbeError::ConfigNotFound(_))
        ));
    }

    #[test]
    fn test_unquoted_ini_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.conf");
        fs::write(
            &path,
            "[global]\nhost = 10.0.0.5\nuser = root@pam\npassword = pw\n",
        )
        .unwrap();

        let err = ConnectionConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
        assert!(err.to_string().starts_with("配置文件解析错误"));
    }

    #[test]
    fn test_from_args_reports_first_missing_flag() {
        let err = ConnectionConfig::from_args(Some("pve".into()), None, Some("pw".into())).unwrap_err();
        assert!(err.to_string().contains("-u"));
        let err =
            ConnectionConfig::from_args(Some("pve".into()), Some("root@pam".into()), None).unwrap_err();
        assert!(err.to_string().contains("-p"));
        let err = ConnectionConfig::from_args(None, Some("root@pam".into()), Some("pw".into()))
            .unwrap_err();
        assert!(err.to_string().contains("-s"));
    }

    #[test]
    fn test_base_url_with_scheme() {
        let config = ConnectionConfig::from_args(
            Some("https://pve.local:8006/".into()),
            Some("root@pam".into()),
            Some("pw".into()),
        )
        .unwrap();
        assert_eq!(config.base_url(), "https://pve.local:8006/api2/json");
    }

    #[test]
    fn test_debug_hides_password() {
        let config =
            ConnectionConfig::from_args(Some("pve".into()), Some("root@pam".into()), Some("topsecret".into()))
                .unwrap();
        assert!(!format!("{config:?}").contains("topsecret"));
    }
}
