//! # Cloud-config rendering
//!
//! Produces the `user-data` text the CoreOS instance reads on first boot. The
//! template is fixed; the only substituted value is the MySQL InnoDB buffer
//! pool size, chosen from the machine type.

use std::fs;
use std::path::Path;

use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde_json::json;

use crate::error::{ProvisionError, Result};

/// Upper bound on the cloud-config length accepted by the compute API.
pub const MAX_CLOUD_CONFIG_BYTES: usize = 32 << 10;

static ENGINE: Lazy<Handlebars<'static>> = Lazy::new(new_engine);

fn new_engine() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

const CLOUD_CONFIG_TEMPLATE: &str = r#"#cloud-config
write_files:
  - path: /var/lib/camlistore/tmp/README
    permissions: 0644
    content: |
      This is the Camlistore /tmp directory.
  - path: /var/lib/camlistore/mysql/README
    permissions: 0644
    content: |
      This is the Camlistore MySQL data directory.
coreos:
  units:
    - name: cam-journal-gatewayd.service
      content: |
        [Unit]
        Description=Journal Gateway Service
        Requires=cam-journal-gatewayd.socket
        
        [Service]
        ExecStart=/usr/lib/systemd/systemd-journal-gatewayd
        User=systemd-journal-gateway
        Group=systemd-journal-gateway
        SupplementaryGroups=systemd-journal
        PrivateTmp=yes
        PrivateDevices=yes
        PrivateNetwork=yes
        ProtectSystem=full
        ProtectHome=yes
        
        [Install]
        Also=cam-journal-gatewayd.socket
    - name: cam-journal-gatewayd.socket
      command: start
      content: |
        [Unit]
        Description=Journal Gateway Service Socket
        
        [Socket]
        ListenStream=/run/camjournald.sock
        
        [Install]
        WantedBy=sockets.target
    - name: mysql.service
      command: start
      content: |
        [Unit]
        Description=MySQL
        After=docker.service
        Requires=docker.service
        
        [Service]
        ExecStartPre=/usr/bin/docker run --rm -v /opt/bin:/opt/bin ibuildthecloud/systemd-docker
        ExecStart=/opt/bin/systemd-docker run --rm --name %n -v /var/lib/camlistore/mysql:/mysql -e INNODB_BUFFER_POOL_SIZE={{{innodb_buffer_pool_size}}} camlistore/mysql
        RestartSec=1s
        Restart=always
        Type=notify
        NotifyAccess=all
        
        [Install]
        WantedBy=multi-user.target
    - name: camlistored.service
      command: start
      content: |
        [Unit]
        Description=Camlistore
        After=docker.service
        Requires=docker.service mysql.service
        
        [Service]
        ExecStartPre=/usr/bin/docker run --rm -v /opt/bin:/opt/bin ibuildthecloud/systemd-docker
        ExecStart=/opt/bin/systemd-docker run --rm -p 80:80 -p 443:443 --name %n -v /run/camjournald.sock:/run/camjournald.sock -v /var/lib/camlistore/tmp:/tmp --link=mysql.service:mysqldb camlistore/camlistored
        RestartSec=1s
        Restart=always
        Type=notify
        NotifyAccess=all
        
        [Install]
        WantedBy=multi-user.target
"#;

/// MySQL InnoDB buffer pool size in bytes for a GCE machine type.
///
/// camlistored loads the index into its own memory at start-up, so MySQL only
/// needs a little more than its 8 MiB default.
pub fn innodb_buffer_pool_size(machine_type: &str) -> u64 {
    match machine_type {
        "f1-micro" => 32 << 20,
        "g1-small" => 64 << 20,
        _ => 128 << 20,
    }
}

/// Rendered cloud-config, ready to be used as instance `user-data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    text: String,
    validated_len: usize,
    has_ssh_key: bool,
}

impl BootstrapConfig {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    /// Length of the text that passed [`validate`], before any SSH key block.
    pub fn validated_len(&self) -> usize {
        self.validated_len
    }

    pub fn has_ssh_key(&self) -> bool {
        self.has_ssh_key
    }
}

/// Substitutes the machine-type tuning value into the template.
pub fn render(machine_type: &str) -> Result<String> {
    let text = ENGINE.render_template(
        CLOUD_CONFIG_TEMPLATE,
        &json!({ "innodb_buffer_pool_size": innodb_buffer_pool_size(machine_type) }),
    )?;
    Ok(text)
}

pub fn validate(text: &str) -> Result<()> {
    if text.len() > MAX_CLOUD_CONFIG_BYTES {
        return Err(ProvisionError::ConfigTooLarge {
            len: text.len(),
            limit: MAX_CLOUD_CONFIG_BYTES,
        });
    }
    Ok(())
}

/// Appends an `ssh_authorized_keys` block for `key`.
pub fn append_ssh_key(mut text: String, key: &str) -> String {
    text.push_str(&format!("\nssh_authorized_keys:\n    - {}\n", key.trim()));
    text
}

fn read_ssh_key(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ProvisionError::SshKey {
            path: path.to_path_buf(),
            source,
        })
}

/// Renders and validates the cloud-config, then appends the SSH key if given.
///
/// The size limit is checked before the key block is appended, so the final
/// text may exceed [`MAX_CLOUD_CONFIG_BYTES`] by the size of that block.
pub fn build(machine_type: &str, ssh_key_path: Option<&Path>) -> Result<BootstrapConfig> {
    let text = render(machine_type)?;
    validate(&text)?;
    let validated_len = text.len();

    let (text, has_ssh_key) = match ssh_key_path {
        Some(path) => {
            let key = read_ssh_key(path)?;
            (append_ssh_key(text, &key), true)
        }
        None => (text, false),
    };

    tracing::debug!(
        machine_type,
        validated_len,
        len = text.len(),
        has_ssh_key,
        "rendered cloud config"
    );
    Ok(BootstrapConfig {
        text,
        validated_len,
        has_ssh_key,
    })
}
