use crate::config::ConnectionConfig;
use crate::constants::{api, vzdump};
use crate::error::{ProbeError, Result};
use crate::schedule::BackupJobRecord;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

/// Proxmox VE API 客户端（只读）
#[derive(Debug, Clone)]
pub struct PveClient {
    client: Client,
    base_url: String,
    ticket: Option<String>,
}

/// API 响应统一包在 `data` 字段里
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

/// 登录响应
#[derive(Debug, Deserialize)]
struct TicketData {
    ticket: String,
}

/// 集群资源
#[derive(Debug, Deserialize)]
pub struct ResourceRecord {
    #[serde(default)]
    pub vmid: Option<Value>,
}

/// 存储配置
#[derive(Debug, Deserialize)]
pub struct StorageRecord {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl PveClient {
    /// 根据连接配置创建客户端（尚未登录）
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        Self::with_base_url(config.base_url(), config.verify_ssl)
    }

    /// 使用指定的基础地址创建客户端
    pub fn with_base_url(base_url: impl Into<String>, verify_ssl: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api::http::DEFAULT_TIMEOUT))
            .user_agent(api::http::USER_AGENT)
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            ticket: None,
        })
    }

    /// 创建客户端并登录
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.login(&config.user, &config.password).await?;
        Ok(client)
    }

    /// 获取完整的端点URL
    pub fn get_endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// 用户名密码登录，获取 ticket
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let url = self.get_endpoint_url(api::endpoints::ACCESS_TICKET);
        debug!("登录 Proxmox VE: {} ({})", url, user);

        let response = self
            .client
            .post(&url)
            .form(&[("username", user), ("password", password)])
            .send()
            .await?;

        if response.status().is_success() {
            let envelope: ApiEnvelope<TicketData> = response.json().await?;
            self.ticket = Some(envelope.data.ticket);
            debug!("登录成功");
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("登录失败: {} - {}", status, text);
            Err(ProbeError::Auth(format!("{user}: {status}")))
        }
    }

    /// 发送带认证 cookie 的 GET 请求并取出 `data`
    async fn get_data<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.get_endpoint_url(endpoint);
        let mut request = self.client.get(&url);
        if let Some(ref ticket) = self.ticket {
            request = request.header(
                reqwest::header::COOKIE,
                format!("{}={}", api::AUTH_COOKIE, ticket),
            );
        }

        let response = request.send().await?;
        if response.status().is_success() {
            let envelope: ApiEnvelope<T> = response.json().await?;
            Ok(envelope.data)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("请求 {} 失败: {} - {}", endpoint, status, text);
            Err(ProbeError::Api(format!("{endpoint}: {status} - {text}")))
        }
    }

    /// 获取集群备份任务列表
    pub async fn get_backup_jobs(&self) -> Result<Vec<BackupJobRecord>> {
        let jobs: Vec<BackupJobRecord> = self.get_data(api::endpoints::CLUSTER_BACKUP).await?;
        debug!("备份任务: {:?}", jobs);
        Ok(jobs)
    }

    /// 获取集群内全部虚拟机ID，没有 vmid 的资源被忽略
    pub async fn get_vm_inventory(&self) -> Result<BTreeSet<u32>> {
        let resources: Vec<ResourceRecord> =
            self.get_data(api::endpoints::CLUSTER_VM_RESOURCES).await?;

        let inventory = resources
            .iter()
            .filter_map(|resource| match &resource.vmid {
                Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                Some(Value::String(s)) => s.trim().parse().ok(),
                _ => None,
            })
            .collect();
        debug!("虚拟机清单: {:?}", inventory);
        Ok(inventory)
    }

    /// 获取存储的本地路径并拼接 `dump` 子目录
    pub async fn get_storage_dump_dir(&self, storage: &str) -> Result<PathBuf> {
        let endpoint = api::endpoints::STORAGE_CONFIG.replace("{storage}", storage);
        let record: StorageRecord = self.get_data(&endpoint).await?;
        debug!("存储配置 {}: {:?}", storage, record);

        match record.path {
            Some(path) if !path.trim().is_empty() => {
                Ok(PathBuf::from(path).join(vzdump::DUMP_DIR_NAME))
            }
            _ => Err(ProbeError::storage(format!(
                "存储 {} 没有本地路径 (type: {})，请使用 -P 指定备份目录",
                storage,
                record.kind.as_deref().unwrap_or("unknown")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    async fn logged_in(server: &mockito::ServerGuard) -> PveClient {
        let mut client =
            PveClient::with_base_url(format!("{}/api2/json", server.url()), false).unwrap();
        client.login("monitoring@pve", "secret").await.unwrap();
        client
    }

    async fn mock_login(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/api2/json/access/ticket")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("username".into(), "monitoring@pve".into()),
                Matcher::UrlEncoded("password".into(), "secret".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"ticket":"PVE:monitoring@pve:ABC","CSRFPreventionToken":"x","username":"monitoring@pve"}}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_login_and_fetch_jobs() {
        let mut server = mockito::Server::new_async().await;
        let login = mock_login(&mut server).await;
        let jobs = server
            .mock("GET", "/api2/json/cluster/backup")
            .match_header("cookie", "PVEAuthCookie=PVE:monitoring@pve:ABC")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[
                    {"id":"backup-a","storage":"local","enabled":1,"schedule":"sat 02:00","vmid":"100,101"},
                    {"id":"backup-b","storage":"nfs","all":1,"exclude":"102","dow":"mon","starttime":"21:00"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = logged_in(&server).await;
        let records = client.get_backup_jobs().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].schedule.as_deref(), Some("sat 02:00"));
        assert_eq!(records[1].dow.as_deref(), Some("mon"));

        login.assert_async().await;
        jobs.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api2/json/access/ticket")
            .with_status(401)
            .with_body("authentication failure")
            .create_async()
            .await;

        let mut client =
            PveClient::with_base_url(format!("{}/api2/json", server.url()), false).unwrap();
        let err = client.login("monitoring@pve", "wrong").await.unwrap_err();
        assert!(matches!(err, ProbeError::Auth(_)));
    }

    #[tokio::test]
    async fn test_vm_inventory_skips_resources_without_vmid() {
        let mut server = mockito::Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", "/api2/json/cluster/resources")
            .match_query(Matcher::UrlEncoded("type".into(), "vm".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[
                    {"id":"qemu/100","type":"qemu","vmid":100},
                    {"id":"lxc/105","type":"lxc","vmid":"105"},
                    {"id":"node/pve1","type":"node"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = logged_in(&server).await;
        let inventory = client.get_vm_inventory().await.unwrap();
        assert_eq!(inventory, BTreeSet::from([100, 105]));
    }

    #[tokio::test]
    async fn test_storage_dump_dir() {
        let mut server = mockito::Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", "/api2/json/storage/backup-nfs")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"storage":"backup-nfs","type":"nfs","path":"/mnt/pve/backup-nfs"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api2/json/storage/pbs")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"storage":"pbs","type":"pbs"}}"#)
            .create_async()
            .await;

        let client = logged_in(&server).await;
        assert_eq!(
            client.get_storage_dump_dir("backup-nfs").await.unwrap(),
            PathBuf::from("/mnt/pve/backup-nfs/dump")
        );
        let err = client.get_storage_dump_dir("pbs").await.unwrap_err();
        assert!(matches!(err, ProbeError::Storage(_)));
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let mut server = mockito::Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", "/api2/json/cluster/backup")
            .with_status(403)
            .with_body("permission denied")
            .create_async()
            .await;

        let client = logged_in(&server).await;
        let err = client.get_backup_jobs().await.unwrap_err();
        assert!(matches!(err, ProbeError::Api(_)));
        assert!(err.to_string().contains("403"));
    }
}
