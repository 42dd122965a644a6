use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::{NewManager, ROLE_MANAGER};
use crate::seed::SeedError;

/// Startup data: managers, each with the trackers created on their behalf
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeedPlan {
    pub managers: Vec<SeedManager>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedManager {
    pub name: String,
    pub password: String,
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
    #[serde(default)]
    pub trackers: Vec<SeedTracker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedTracker {
    pub customer_name: String,
    pub product_name: String,
    pub current_status: String,
}

fn default_roles() -> Vec<String> {
    vec![ROLE_MANAGER.to_string()]
}

impl SeedManager {
    pub fn new_manager(&self) -> NewManager {
        NewManager::new(self.name.clone(), self.password.clone(), self.roles.clone())
    }
}

impl SeedPlan {
    /// Read a JSON plan from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SeedError::PlanIo {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| SeedError::PlanFormat {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn manager_count(&self) -> usize {
        self.managers.len()
    }

    pub fn tracker_count(&self) -> usize {
        self.managers.iter().map(|m| m.trackers.len()).sum()
    }

    /// The demo accounts and trackers loaded when no plan file is configured
    pub fn reference() -> Self {
        Self {
            managers: vec![
                manager(
                    "test",
                    &[
                        ("Bank Of America", "CreditCard", "Pre Sales"),
                        ("WellsFargo", "Loyalty Program", "Under Contract"),
                        ("Capital One", "3D Secure", "On Boarding"),
                    ],
                ),
                manager(
                    "baig",
                    &[
                        ("JP Morgan", "DebitCard", "RFP"),
                        ("USAA", "Switch", "Implementaion"),
                        ("SSFCU", "Processing", "Renewal"),
                    ],
                ),
                manager(
                    "bharat",
                    &[
                        ("Caixa", "MDES", "RFP"),
                        ("Key Bank", "MasterPass", "Implementaion"),
                        ("FCBI", "Clearing", "started"),
                    ],
                ),
            ],
        }
    }
}

/// Demo manager whose password equals its login
fn manager(name: &str, trackers: &[(&str, &str, &str)]) -> SeedManager {
    SeedManager {
        name: name.to_string(),
        password: name.to_string(),
        roles: default_roles(),
        trackers: trackers
            .iter()
            .map(|(customer, product, status)| SeedTracker {
                customer_name: customer.to_string(),
                product_name: product.to_string(),
                current_status: status.to_string(),
            })
            .collect(),
    }
}
