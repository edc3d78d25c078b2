use std::sync::Arc;

use adw::prelude::*;
use relm4::prelude::*;

use confab::api::ChatBackend;
use confab::config;
use confab::services::conversations::new_conversation_id;
use confab::services::{PickerEvent, SelectionEvent};
use crate::ui::chat_view::{ChatView, ChatViewMsg, ChatViewOutput};
use crate::ui::prompt_picker::{PromptPickerOutput, PromptPickerView};
use crate::ui::sidebar::{Sidebar, SidebarMsg, SidebarOutput};

pub struct App {
    sidebar: Controller<Sidebar>,
    chat_view: Controller<ChatView>,
    prompt_picker: Controller<PromptPickerView>,
    selected_conversation: Option<String>,
    toast_overlay: adw::ToastOverlay,
    content_stack: gtk::Stack,
    split_view: adw::OverlaySplitView,
    picker_revealer: gtk::Revealer,
}

#[derive(Debug)]
pub enum AppMsg {
    NewChat,
    Selection(SelectionEvent),
    MessageSent,
    Picker(PickerEvent),
    ToggleSidebar,
    TogglePicker,
    ShowToast(String),
}

#[relm4::component(pub, async)]
impl AsyncComponent for App {
    type Init = Arc<dyn ChatBackend>;
    type Input = AppMsg;
    type Output = ();
    type CommandOutput = ();

    view! {
        adw::ApplicationWindow {
            set_title: Some(config::APP_NAME),
            set_default_width: 1100,
            set_default_height: 760,
            set_width_request: 360,
            set_height_request: 480,

            #[local_ref]
            toast_overlay -> adw::ToastOverlay {},
        }
    }

    async fn init(
        backend: Self::Init,
        root: Self::Root,
        sender: AsyncComponentSender<Self>,
    ) -> AsyncComponentParts<Self> {
        let sidebar = Sidebar::builder()
            .launch(backend.clone())
            .forward(sender.input_sender(), |output| match output {
                SidebarOutput::NewChat => AppMsg::NewChat,
                SidebarOutput::Selection(event) => AppMsg::Selection(event),
                SidebarOutput::Toast(message) => AppMsg::ShowToast(message),
            });

        let chat_view = ChatView::builder()
            .launch(backend.clone())
            .forward(sender.input_sender(), |output| match output {
                ChatViewOutput::MessageSent => AppMsg::MessageSent,
            });

        let prompt_picker = PromptPickerView::builder()
            .launch(backend)
            .forward(sender.input_sender(), |output| match output {
                PromptPickerOutput::Event(event) => AppMsg::Picker(event),
            });

        let toast_overlay = adw::ToastOverlay::new();
        toast_overlay.set_hexpand(true);
        toast_overlay.set_vexpand(true);

        let content_stack = gtk::Stack::new();
        content_stack.set_hexpand(true);
        content_stack.set_vexpand(true);

        // Nothing selected
        let empty_page = adw::StatusPage::new();
        empty_page.set_title("Start a New Conversation");
        empty_page.set_description(Some("Pick a conversation from the list or start a new one"));
        empty_page.set_icon_name(Some("chat-symbolic"));
        let new_chat_btn = gtk::Button::builder()
            .label("New Chat")
            .halign(gtk::Align::Center)
            .build();
        new_chat_btn.add_css_class("suggested-action");
        new_chat_btn.add_css_class("pill");
        let sender_btn = sender.input_sender().clone();
        new_chat_btn.connect_clicked(move |_| {
            let _ = sender_btn.send(AppMsg::NewChat);
        });
        empty_page.set_child(Some(&new_chat_btn));
        content_stack.add_named(&empty_page, Some("empty"));
        content_stack.add_named(chat_view.widget(), Some("chat"));
        content_stack.set_visible_child_name("empty");

        let picker_revealer = gtk::Revealer::builder()
            .transition_type(gtk::RevealerTransitionType::SlideLeft)
            .reveal_child(false)
            .child(prompt_picker.widget())
            .build();

        let content_box = gtk::Box::new(gtk::Orientation::Horizontal, 0);
        content_box.append(&content_stack);
        content_box.append(&picker_revealer);

        let content_header = adw::HeaderBar::new();

        let sidebar_btn = gtk::Button::builder()
            .icon_name("sidebar-show-symbolic")
            .tooltip_text("Toggle conversation list")
            .build();
        let sender_sidebar = sender.input_sender().clone();
        sidebar_btn.connect_clicked(move |_| {
            let _ = sender_sidebar.send(AppMsg::ToggleSidebar);
        });
        content_header.pack_start(&sidebar_btn);

        let picker_btn = gtk::Button::builder()
            .icon_name("starred-symbolic")
            .tooltip_text("Conversation starters")
            .build();
        let sender_picker = sender.input_sender().clone();
        picker_btn.connect_clicked(move |_| {
            let _ = sender_picker.send(AppMsg::TogglePicker);
        });
        content_header.pack_end(&picker_btn);

        let content_toolbar = adw::ToolbarView::new();
        content_toolbar.add_top_bar(&content_header);
        content_toolbar.set_content(Some(&content_box));

        let split_view = adw::OverlaySplitView::new();
        split_view.set_hexpand(true);
        split_view.set_vexpand(true);
        split_view.set_min_sidebar_width(240.0);
        split_view.set_max_sidebar_width(320.0);
        split_view.set_sidebar(Some(sidebar.widget()));
        split_view.set_content(Some(&content_toolbar));

        // Collapse the list into an overlay on narrow windows
        if let Ok(condition) = adw::BreakpointCondition::parse("max-width: 600px") {
            let breakpoint = adw::Breakpoint::new(condition);
            breakpoint.add_setter(&split_view, "collapsed", Some(&true.to_value()));
            root.add_breakpoint(breakpoint);
        }

        toast_overlay.set_child(Some(&split_view));

        let model = App {
            sidebar,
            chat_view,
            prompt_picker,
            selected_conversation: None,
            toast_overlay: toast_overlay.clone(),
            content_stack,
            split_view,
            picker_revealer,
        };

        let widgets = view_output!();

        let app = relm4::main_adw_application();
        let sender_new = sender.input_sender().clone();
        let new_chat_action = gio::SimpleAction::new("new-chat", None);
        new_chat_action.connect_activate(move |_, _| {
            let _ = sender_new.send(AppMsg::NewChat);
        });
        app.add_action(&new_chat_action);
        app.set_accels_for_action("app.new-chat", &["<Control>n"]);

        AsyncComponentParts { model, widgets }
    }

    async fn update(
        &mut self,
        msg: Self::Input,
        _sender: AsyncComponentSender<Self>,
        _root: &Self::Root,
    ) {
        match msg {
            AppMsg::NewChat => {
                let id = new_conversation_id();
                tracing::info!("Starting new conversation {}", id);
                self.open_conversation(id);
            }
            AppMsg::Selection(SelectionEvent::Selected(id)) => {
                self.open_conversation(id);
            }
            AppMsg::Selection(SelectionEvent::Cleared) => {
                self.selected_conversation = None;
                self.sidebar.emit(SidebarMsg::SetSelected(None));
                self.chat_view.emit(ChatViewMsg::Close);
                self.content_stack.set_visible_child_name("empty");
            }
            AppMsg::MessageSent => {
                self.sidebar.emit(SidebarMsg::Refresh);
            }
            AppMsg::Picker(PickerEvent::TopicChanged(topic)) => {
                tracing::debug!("Topic changed to {}", topic);
            }
            AppMsg::Picker(PickerEvent::StarterChosen(text)) => {
                if self.selected_conversation.is_none() {
                    self.open_conversation(new_conversation_id());
                }
                self.chat_view.emit(ChatViewMsg::Prefill(text));
                self.picker_revealer.set_reveal_child(false);
            }
            AppMsg::ToggleSidebar => {
                self.split_view
                    .set_show_sidebar(!self.split_view.shows_sidebar());
            }
            AppMsg::TogglePicker => {
                self.picker_revealer
                    .set_reveal_child(!self.picker_revealer.reveals_child());
            }
            AppMsg::ShowToast(message) => {
                self.show_toast(&message);
            }
        }
    }
}

impl App {
    fn open_conversation(&mut self, id: String) {
        self.sidebar.emit(SidebarMsg::SetSelected(Some(id.clone())));
        self.chat_view.emit(ChatViewMsg::Open(id.clone()));
        self.selected_conversation = Some(id);
        self.content_stack.set_visible_child_name("chat");
        self.picker_revealer.set_reveal_child(false);
        if self.split_view.is_collapsed() {
            self.split_view.set_show_sidebar(false);
        }
    }

    fn show_toast(&self, message: &str) {
        let toast = adw::Toast::new(message);
        toast.set_timeout(3);
        self.toast_overlay.add_toast(toast);
    }
}
