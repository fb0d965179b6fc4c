use std::path::PathBuf;

pub const DEFAULT_ZONE: &str = "us-central1-a";
pub const DEFAULT_MACHINE_TYPE: &str = "g1-small";
pub const DEFAULT_INSTANCE_NAME: &str = "camlistore-server";
pub const DEFAULT_CLIENT_ID_FILE: &str = "client-id.dat";
pub const DEFAULT_CLIENT_SECRET_FILE: &str = "client-secret.dat";

pub const HELP_CREATE_PROJECT: &str =
    "Create new project: go to https://console.developers.google.com to create a new Project.";
pub const HELP_ENABLE_AUTH: &str = "Enable authentication: in your project console, navigate to \"APIs and auth\", \"Credentials\", click on \"Create new Client ID\" and pick \"Installed application\", with type \"Other\". Copy the CLIENT ID to client-id.dat, and the CLIENT SECRET to client-secret.dat";
pub const HELP_ENABLE_APIS: &str = "Enable the project APIs: in your project console, navigate to \"APIs and auth\", \"APIs\". In the list, enable \"Google Cloud Storage\", \"Google Cloud Storage JSON API\", and \"Google Compute Engine\".";

/// Getting-started hints, in the order an operator needs them.
pub const GETTING_STARTED: [&str; 3] = [HELP_CREATE_PROJECT, HELP_ENABLE_AUTH, HELP_ENABLE_APIS];

/// Everything a provisioning run needs to know, fixed before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub project: String,
    pub zone: String,
    pub machine_type: String,
    pub instance_name: String,
    /// Public key file to authorize for SSH on the instance.
    pub ssh_public_key: Option<PathBuf>,
    pub client_id_file: PathBuf,
    pub client_secret_file: PathBuf,
}

impl ProvisionConfig {
    /// A config for `project` with every other setting at its default.
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            zone: DEFAULT_ZONE.to_string(),
            machine_type: DEFAULT_MACHINE_TYPE.to_string(),
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            ssh_public_key: None,
            client_id_file: DEFAULT_CLIENT_ID_FILE.into(),
            client_secret_file: DEFAULT_CLIENT_SECRET_FILE.into(),
        }
    }
}
