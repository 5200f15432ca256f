use clap::Subcommand;

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls", visible_alias = "l")]
    List {
        /// Only show profiles carrying one of these tags
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "sh", visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add", visible_alias = "create")]
    #[command(after_help = "EXAMPLES:
    # Service principal plus a default VM
    avmctl profile set prod \\
        --subscription-id 00000000-0000-0000-0000-000000000000 \\
        --tenant-id 11111111-1111-1111-1111-111111111111 \\
        --client-id 22222222-2222-2222-2222-222222222222 \\
        --client-secret 'secret' \\
        --resource-group rg-web --vm-name web-01

    # Keep the secret out of the file: expanded from the environment at load time
    avmctl profile set ci ... --client-secret '${AZURE_CLIENT_SECRET}'

    # Post outcomes to a webhook
    avmctl profile set prod ... --mode prod --webhook-url https://hooks.example.com/avm
")]
    Set {
        /// Profile name
        name: String,

        /// Azure subscription id
        #[arg(long)]
        subscription_id: String,

        /// Entra ID tenant of the service principal
        #[arg(long)]
        tenant_id: String,

        /// Service principal application (client) id
        #[arg(long)]
        client_id: String,

        /// Service principal secret (plaintext, or ${VAR} to expand at load time)
        #[arg(long)]
        client_secret: String,

        /// Default resource group
        #[arg(long)]
        resource_group: Option<String>,

        /// Default VM name
        #[arg(long)]
        vm_name: Option<String>,

        /// Notification mode ('dev' or any other name)
        #[arg(long)]
        mode: Option<String>,

        /// Webhook for non-dev modes
        #[arg(long)]
        webhook_url: Option<String>,

        /// Identity endpoint (sovereign clouds)
        #[arg(long)]
        authority_host: Option<String>,

        /// Resource Manager endpoint (sovereign clouds)
        #[arg(long)]
        resource_manager: Option<String>,

        /// Tags for grouping profiles (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,

        /// Store the client secret in the OS keyring instead of the config file
        #[cfg(feature = "secure-storage")]
        #[arg(long)]
        use_keyring: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm", visible_alias = "del", visible_alias = "delete")]
    Remove {
        /// Profile name to remove
        name: String,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Set the default profile
    Default {
        /// Profile name
        name: String,
    },
}
