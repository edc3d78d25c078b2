use std::sync::Arc;

use adw::prelude::*;
use chrono::Utc;
use relm4::factory::FactoryVecDeque;
use relm4::prelude::*;

use confab::api::ChatBackend;
use confab::models::Conversation;
use confab::services::conversations::{self, relative_day_label, DeleteOutcome};
use confab::services::{ConversationList, ListStatus, SelectionEvent};

// --- ConversationRow factory component ---

#[derive(Debug)]
pub struct ConversationRow {
    pub conversation: Conversation,
}

#[derive(Debug)]
pub enum ConversationRowOutput {
    Delete(String),
}

#[relm4::factory(pub)]
impl FactoryComponent for ConversationRow {
    type Init = Conversation;
    type Input = ();
    type Output = ConversationRowOutput;
    type CommandOutput = ();
    type ParentWidget = gtk::ListBox;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Horizontal,
            set_spacing: 6,
            set_margin_all: 6,
        }
    }

    fn init_model(conversation: Self::Init, _index: &DynamicIndex, _sender: FactorySender<Self>) -> Self {
        Self { conversation }
    }

    fn init_widgets(
        &mut self,
        _index: &DynamicIndex,
        root: Self::Root,
        _returned_widget: &<Self::ParentWidget as relm4::factory::FactoryView>::ReturnedWidget,
        sender: FactorySender<Self>,
    ) -> Self::Widgets {
        let conv = &self.conversation;

        let text_box = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(2)
            .hexpand(true)
            .build();

        let title_label = gtk::Label::builder()
            .label(conv.display_title())
            .halign(gtk::Align::Start)
            .ellipsize(gtk::pango::EllipsizeMode::End)
            .max_width_chars(30)
            .build();
        title_label.add_css_class("heading");
        text_box.append(&title_label);

        if let Some(preview) = conv.preview() {
            let preview_label = gtk::Label::builder()
                .label(preview)
                .halign(gtk::Align::Start)
                .ellipsize(gtk::pango::EllipsizeMode::End)
                .max_width_chars(35)
                .build();
            preview_label.add_css_class("dim-label");
            preview_label.add_css_class("caption");
            text_box.append(&preview_label);
        }

        let meta = format!(
            "{} \u{b7} {} messages",
            relative_day_label(conv.updated_at, Utc::now()),
            conv.message_count
        );
        let meta_label = gtk::Label::builder()
            .label(meta)
            .halign(gtk::Align::Start)
            .build();
        meta_label.add_css_class("dim-label");
        meta_label.add_css_class("caption");
        meta_label.set_opacity(0.7);
        text_box.append(&meta_label);

        root.append(&text_box);

        let delete_btn = gtk::Button::builder()
            .icon_name("user-trash-symbolic")
            .tooltip_text("Delete conversation")
            .valign(gtk::Align::Center)
            .build();
        delete_btn.add_css_class("flat");
        delete_btn.add_css_class("circular");
        let id = conv.id.clone();
        let sender_del = sender.output_sender().clone();
        delete_btn.connect_clicked(move |_| {
            let _ = sender_del.send(ConversationRowOutput::Delete(id.clone()));
        });
        root.append(&delete_btn);

        let widgets = view_output!();
        widgets
    }
}

// --- Sidebar component ---

pub struct Sidebar {
    backend: Arc<dyn ChatBackend>,
    list: ConversationList,
    rows: FactoryVecDeque<ConversationRow>,
}

#[derive(Debug)]
pub enum SidebarMsg {
    Refresh,
    NewChat,
    RowActivated(usize),
    RequestDelete(String),
    ConfirmDelete,
    CancelDelete,
    /// Sync the highlighted row with the shell's selection.
    SetSelected(Option<String>),
}

#[derive(Debug)]
pub enum SidebarOutput {
    NewChat,
    Selection(SelectionEvent),
    Toast(String),
}

#[derive(Debug)]
pub enum SidebarCmd {
    Loaded(Result<Vec<Conversation>, confab::api::ApiError>),
    Deleted(String, Result<(), confab::api::ApiError>),
}

#[relm4::component(pub)]
impl Component for Sidebar {
    type Init = Arc<dyn ChatBackend>;
    type Input = SidebarMsg;
    type Output = SidebarOutput;
    type CommandOutput = SidebarCmd;

    view! {
        adw::ToolbarView {
            add_top_bar = &adw::HeaderBar {
                set_show_end_title_buttons: false,

                pack_start = &gtk::Button {
                    set_icon_name: "list-add-symbolic",
                    set_tooltip_text: Some("New Chat"),
                    connect_clicked => SidebarMsg::NewChat,
                },

                pack_end = &gtk::Button {
                    set_icon_name: "view-refresh-symbolic",
                    set_tooltip_text: Some("Refresh"),
                    connect_clicked => SidebarMsg::Refresh,
                },

                #[wrap(Some)]
                set_title_widget = &adw::WindowTitle {
                    set_title: "Conversations",
                },
            },

            #[wrap(Some)]
            set_content = &gtk::Stack {
                #[watch]
                set_visible_child_name: model.page_name(),

                add_named[Some("loading")] = &gtk::Spinner {
                    set_spinning: true,
                    set_halign: gtk::Align::Center,
                    set_valign: gtk::Align::Center,
                    set_width_request: 32,
                    set_height_request: 32,
                },

                add_named[Some("error")] = &adw::StatusPage {
                    set_icon_name: Some("network-error-symbolic"),
                    set_title: "Could not load conversations",
                    #[watch]
                    set_description: model.error_text(),

                    #[wrap(Some)]
                    set_child = &gtk::Button {
                        set_label: "Retry",
                        set_halign: gtk::Align::Center,
                        add_css_class: "pill",
                        connect_clicked => SidebarMsg::Refresh,
                    },
                },

                add_named[Some("empty")] = &adw::StatusPage {
                    set_icon_name: Some("chat-symbolic"),
                    set_title: "No conversations yet",
                    set_description: Some("Start a new chat to begin"),
                },

                add_named[Some("list")] = &gtk::ScrolledWindow {
                    set_hscrollbar_policy: gtk::PolicyType::Never,
                    set_vexpand: true,

                    #[local_ref]
                    conversation_list -> gtk::ListBox {
                        set_selection_mode: gtk::SelectionMode::Single,
                        add_css_class: "navigation-sidebar",
                    },
                },
            },
        }
    }

    fn init(
        backend: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let rows = FactoryVecDeque::builder()
            .launch(gtk::ListBox::default())
            .forward(sender.input_sender(), |output| match output {
                ConversationRowOutput::Delete(id) => SidebarMsg::RequestDelete(id),
            });

        let model = Self {
            backend,
            list: ConversationList::new(),
            rows,
        };

        let conversation_list = model.rows.widget();
        let widgets = view_output!();

        let sender_row = sender.clone();
        model.rows.widget().connect_row_activated(move |_, row| {
            sender_row.input(SidebarMsg::RowActivated(row.index() as usize));
        });

        sender.input(SidebarMsg::Refresh);

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, root: &Self::Root) {
        match msg {
            SidebarMsg::Refresh => {
                self.list.begin_load();
                let backend = self.backend.clone();
                sender.command(move |out, _| {
                    Box::pin(async move {
                        let result = conversations::fetch_conversations(backend).await;
                        let _ = out.send(SidebarCmd::Loaded(result));
                    })
                });
            }
            SidebarMsg::NewChat => {
                let _ = sender.output(SidebarOutput::NewChat);
            }
            SidebarMsg::RowActivated(index) => {
                let id = self.list.conversations().get(index).map(|c| c.id.clone());
                if let Some(id) = id {
                    let event = self.list.select(&id);
                    let _ = sender.output(SidebarOutput::Selection(event));
                }
            }
            SidebarMsg::RequestDelete(id) => {
                if self.list.request_delete(&id) {
                    self.confirm_delete_dialog(&sender, root);
                }
            }
            SidebarMsg::ConfirmDelete => {
                if let Some(id) = self.list.confirm_delete() {
                    let backend = self.backend.clone();
                    sender.command(move |out, _| {
                        Box::pin(async move {
                            let (id, result) = conversations::delete_conversation(backend, id).await;
                            let _ = out.send(SidebarCmd::Deleted(id, result));
                        })
                    });
                }
            }
            SidebarMsg::CancelDelete => {
                self.list.cancel_delete();
            }
            SidebarMsg::SetSelected(id) => {
                self.list.set_selected(id);
                self.sync_selection();
            }
        }
    }

    fn update_cmd(
        &mut self,
        msg: Self::CommandOutput,
        sender: ComponentSender<Self>,
        _root: &Self::Root,
    ) {
        match msg {
            SidebarCmd::Loaded(result) => {
                self.list.finish_load(result);
                self.sync_rows();
            }
            SidebarCmd::Deleted(id, result) => match self.list.finish_delete(&id, result) {
                DeleteOutcome::Removed { selection } => {
                    self.sync_rows();
                    if let Some(event) = selection {
                        let _ = sender.output(SidebarOutput::Selection(event));
                    }
                }
                DeleteOutcome::Failed(message) => {
                    let _ = sender.output(SidebarOutput::Toast(message));
                }
            },
        }
    }
}

impl Sidebar {
    fn page_name(&self) -> &'static str {
        match self.list.status() {
            ListStatus::Loading if self.list.conversations().is_empty() => "loading",
            ListStatus::Failed(_) => "error",
            _ if self.list.conversations().is_empty() => "empty",
            _ => "list",
        }
    }

    fn error_text(&self) -> Option<&str> {
        match self.list.status() {
            ListStatus::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    fn sync_rows(&mut self) {
        let mut guard = self.rows.guard();
        guard.clear();
        for conversation in self.list.conversations() {
            guard.push_back(conversation.clone());
        }
        drop(guard);
        self.sync_selection();
    }

    fn sync_selection(&self) {
        let list_box = self.rows.widget();
        let index = self
            .list
            .selected()
            .and_then(|id| self.list.conversations().iter().position(|c| c.id == id));
        match index.and_then(|i| list_box.row_at_index(i as i32)) {
            Some(row) => list_box.select_row(Some(&row)),
            None => list_box.unselect_all(),
        }
    }

    fn confirm_delete_dialog(&self, sender: &ComponentSender<Self>, root: &adw::ToolbarView) {
        let dialog = adw::AlertDialog::builder()
            .heading("Delete Conversation?")
            .body("Are you sure you want to delete this conversation? This action cannot be undone.")
            .build();
        dialog.add_response("cancel", "Cancel");
        dialog.add_response("delete", "Delete");
        dialog.set_response_appearance("delete", adw::ResponseAppearance::Destructive);
        dialog.set_default_response(Some("cancel"));
        dialog.set_close_response("cancel");

        let sender_dlg = sender.input_sender().clone();
        dialog.connect_response(None, move |_dialog, response| {
            let msg = if response == "delete" {
                SidebarMsg::ConfirmDelete
            } else {
                SidebarMsg::CancelDelete
            };
            let _ = sender_dlg.send(msg);
        });

        if let Some(window) = root.root().and_then(|r| r.downcast::<gtk::Window>().ok()) {
            dialog.present(Some(&window));
        }
    }
}
