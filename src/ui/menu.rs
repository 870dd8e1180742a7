//! Options menu model

/// Index of the "sync all" item
pub const SYNC_ALL_INDEX: usize = 0;

/// Index of the "cancel sync" item
pub const CANCEL_SYNC_INDEX: usize = 1;

/// Actions reachable from the options menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    StartSyncAll,
    CancelSyncAll,
    Logout,
}

impl MenuAction {
    pub fn id(&self) -> &'static str {
        match self {
            Self::StartSyncAll => "synchronize_all",
            Self::CancelSyncAll => "cancel_synchronize_all",
            Self::Logout => "logout",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "synchronize_all" => Some(Self::StartSyncAll),
            "cancel_synchronize_all" => Some(Self::CancelSyncAll),
            "logout" => Some(Self::Logout),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    action: MenuAction,
    title: String,
    visible: bool,
}

impl MenuItem {
    pub fn new(action: MenuAction, title: &str) -> Self {
        Self {
            action,
            title: title.to_string(),
            visible: true,
        }
    }

    pub fn action(&self) -> MenuAction {
        self.action
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// The shell's options menu
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsMenu {
    items: Vec<MenuItem>,
}

impl OptionsMenu {
    pub fn new() -> Self {
        Self {
            items: vec![
                MenuItem::new(MenuAction::StartSyncAll, "Synchronise All"),
                MenuItem::new(MenuAction::CancelSyncAll, "Cancel Synchronisation"),
                MenuItem::new(MenuAction::Logout, "Log Out"),
            ],
        }
    }

    pub fn item(&self, index: usize) -> Option<&MenuItem> {
        self.items.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut MenuItem> {
        self.items.get_mut(index)
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn hide_all(&mut self) {
        for item in &mut self.items {
            item.set_visible(false);
        }
    }

    pub fn visible_actions(&self) -> Vec<MenuAction> {
        self.items
            .iter()
            .filter(|item| item.is_visible())
            .map(MenuItem::action)
            .collect()
    }
}

impl Default for OptionsMenu {
    fn default() -> Self {
        Self::new()
    }
}

/// Visibility of the sync items, derived from whether a sync is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    pub sync_all_visible: bool,
    pub cancel_sync_visible: bool,
}

impl MenuState {
    pub fn for_task(has_active_task: bool) -> Self {
        Self {
            sync_all_visible: !has_active_task,
            cancel_sync_visible: has_active_task,
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.cancel_sync_visible
    }

    pub fn apply(&self, menu: &mut OptionsMenu) {
        if let Some(item) = menu.item_mut(SYNC_ALL_INDEX) {
            item.set_visible(self.sync_all_visible);
        }
        if let Some(item) = menu.item_mut(CANCEL_SYNC_INDEX) {
            item.set_visible(self.cancel_sync_visible);
        }
    }
}
