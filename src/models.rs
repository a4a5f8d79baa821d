use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Row identifiers are strings throughout: the store assigns them for every
// family except radios, whose 4-digit id is chosen by the operator.
pub type Id = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RadioType {
    Portable,
    Mobile,
    Base,
}

impl std::str::FromStr for RadioType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Portable" => Ok(RadioType::Portable),
            "Mobile" => Ok(RadioType::Mobile),
            "Base" => Ok(RadioType::Base),
            other => Err(format!("unknown radio type '{other}'")),
        }
    }
}

impl std::fmt::Display for RadioType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RadioType::Portable => write!(f, "Portable"),
            RadioType::Mobile => write!(f, "Mobile"),
            RadioType::Base => write!(f, "Base"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Radio {
    pub id: Id,
    pub merk: String,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: RadioType,
    pub serienummer: String,
    pub alias: String,
    pub afdeling: String,
    pub opmerking: Option<String>,
    pub registratiedatum: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioForm {
    pub id: Id,
    pub merk: String,
    pub model: String,
    #[serde(rename = "type")]
    pub kind: RadioType,
    pub serienummer: String,
    pub alias: String,
    pub afdeling: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opmerking: Option<String>,
    pub registratiedatum: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadioPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<RadioType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serienummer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afdeling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opmerking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registratiedatum: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    BatteryReplaced,
    Serviced,
    DepartmentChanged,
    AliasChanged,
    IdChanged,
    Issued,
    Installed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub merk: String,
    pub model: String,
    pub afdeling: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_info: Option<VehicleInfo>,
}

/// Append-only audit row; never updated or deleted by this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioHistory {
    pub id: Id,
    pub radio_id: Id,
    pub action: HistoryAction,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub details: Option<HistoryDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRadioHistory {
    pub radio_id: Id,
    pub action: HistoryAction,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HistoryDetails>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accessory {
    pub id: Id,
    pub merk: String,
    pub model: String,
    pub serienummer: Option<String>,
    pub alias: Option<String>,
    pub opmerking: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessoryForm {
    pub merk: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serienummer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opmerking: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serienummer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opmerking: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Radio,
    Accessory,
}

/// Who an item was handed to. `item_id` is a weak reference: the radio or
/// accessory it names may have been deleted since.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Id,
    pub item_type: ItemType,
    pub item_id: Id,
    pub afdeling: String,
    pub issued_to: String,
    pub issued_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueForm {
    pub item_type: ItemType,
    pub item_id: Id,
    pub afdeling: String,
    pub issued_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewIssue {
    #[serde(flatten)]
    pub form: IssueForm,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afdeling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// An item fitted into a vehicle. Same weak-reference policy as [`Issue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: Id,
    pub item_type: ItemType,
    pub item_id: Id,
    pub vehicle_merk: String,
    pub vehicle_model: String,
    pub vehicle_afdeling: String,
    pub installed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationForm {
    pub item_type: ItemType,
    pub item_id: Id,
    pub vehicle_merk: String,
    pub vehicle_model: String,
    pub vehicle_afdeling: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInstallation {
    #[serde(flatten)]
    pub form: InstallationForm,
    pub installed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_merk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_afdeling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandForm {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrandPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub brand_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryForm {
    pub brand_id: Id,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: Id,
    pub category_id: Id,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelForm {
    pub category_id: Id,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadioStats {
    pub total: u64,
    pub portable: u64,
    pub mobile: u64,
    pub base: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_brands: u64,
    pub total_categories: u64,
    pub total_models: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_radios: u64,
    pub portable_radios: u64,
    pub mobile_radios: u64,
    pub base_radios: u64,
    pub total_accessories: u64,
    pub recent_installations: Vec<Installation>,
    pub recent_issues: Vec<Issue>,
    pub recent_registrations: Vec<Radio>,
}

/// A resolved weak reference.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Radio(&'a Radio),
    Accessory(&'a Accessory),
}

impl ItemRef<'_> {
    pub fn label(&self) -> String {
        match self {
            ItemRef::Radio(r) => format!("{} {}", r.merk, r.model),
            ItemRef::Accessory(a) => format!("{} {}", a.merk, a.model),
        }
    }
}

fn resolve_item<'a>(
    item_type: ItemType,
    item_id: &str,
    radios: &'a [Radio],
    accessories: &'a [Accessory],
) -> Option<ItemRef<'a>> {
    match item_type {
        ItemType::Radio => radios.iter().find(|r| r.id == item_id).map(ItemRef::Radio),
        ItemType::Accessory => accessories
            .iter()
            .find(|a| a.id == item_id)
            .map(ItemRef::Accessory),
    }
}

impl Issue {
    /// Looks the issued item up in the given slices. `None` means the target
    /// was deleted after this issue was recorded; callers render a
    /// placeholder, never an error.
    pub fn resolve<'a>(
        &self,
        radios: &'a [Radio],
        accessories: &'a [Accessory],
    ) -> Option<ItemRef<'a>> {
        resolve_item(self.item_type, &self.item_id, radios, accessories)
    }
}

impl Installation {
    pub fn resolve<'a>(
        &self,
        radios: &'a [Radio],
        accessories: &'a [Accessory],
    ) -> Option<ItemRef<'a>> {
        resolve_item(self.item_type, &self.item_id, radios, accessories)
    }
}

/// Display label for a (possibly dangling) item reference.
pub fn item_label(item: Option<ItemRef<'_>>) -> String {
    match item {
        Some(r) => r.label(),
        None => "Onbekend item".to_string(),
    }
}
