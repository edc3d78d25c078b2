use std::sync::Arc;

use gtk::prelude::*;
use relm4::factory::FactoryVecDeque;
use relm4::prelude::*;
use tokio_util::sync::CancellationToken;

use confab::api::ChatBackend;
use confab::models::ImageAttachment;
use confab::services::chat::{self, HistoryResponse, Outcome, SendResponse};
use confab::services::ChatSession;
use crate::ui::input_area::{InputArea, InputAreaMsg, InputAreaOutput};
use crate::ui::message_widget::MessageWidget;

pub struct ChatView {
    backend: Arc<dyn ChatBackend>,
    session: ChatSession,
    messages: FactoryVecDeque<MessageWidget>,
    input_area: Controller<InputArea>,
    scrolled_window: gtk::ScrolledWindow,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub enum ChatViewMsg {
    Open(String),
    Close,
    Send {
        text: String,
        image: Option<ImageAttachment>,
    },
    Retry,
    DismissError,
    Prefill(String),
}

#[derive(Debug)]
pub enum ChatViewOutput {
    /// The backend accepted a message, so the conversation list is out of date.
    MessageSent,
}

#[derive(Debug)]
pub enum ChatViewCmd {
    HistoryLoaded(HistoryResponse),
    SendFinished(SendResponse),
}

#[relm4::component(pub)]
impl Component for ChatView {
    type Init = Arc<dyn ChatBackend>;
    type Input = ChatViewMsg;
    type Output = ChatViewOutput;
    type CommandOutput = ChatViewCmd;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_vexpand: true,

            // Error banner
            gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_spacing: 8,
                set_margin_top: 8,
                set_margin_start: 16,
                set_margin_end: 16,
                add_css_class: "error-banner",
                #[watch]
                set_visible: model.session.error().is_some(),

                gtk::Image {
                    set_icon_name: Some("dialog-warning-symbolic"),
                },

                gtk::Label {
                    set_hexpand: true,
                    set_halign: gtk::Align::Start,
                    set_wrap: true,
                    set_xalign: 0.0,
                    #[watch]
                    set_label: model.session.error().map(|e| e.message.as_str()).unwrap_or(""),
                },

                gtk::Button {
                    set_label: "Retry",
                    add_css_class: "pill",
                    connect_clicked => ChatViewMsg::Retry,
                },

                gtk::Button {
                    set_icon_name: "window-close-symbolic",
                    set_tooltip_text: Some("Dismiss"),
                    add_css_class: "flat",
                    add_css_class: "circular",
                    connect_clicked => ChatViewMsg::DismissError,
                },
            },

            gtk::Stack {
                set_vexpand: true,
                #[watch]
                set_visible_child_name: model.page_name(),

                add_named[Some("loading")] = &gtk::Box {
                    set_orientation: gtk::Orientation::Vertical,
                    set_spacing: 12,
                    set_halign: gtk::Align::Center,
                    set_valign: gtk::Align::Center,

                    gtk::Spinner {
                        set_spinning: true,
                        set_width_request: 32,
                        set_height_request: 32,
                    },
                    gtk::Label {
                        set_label: "Loading conversation...",
                        add_css_class: "dim-label",
                    },
                },

                add_named[Some("welcome")] = &adw::StatusPage {
                    set_icon_name: Some("chat-symbolic"),
                    set_title: "Start the conversation",
                    set_description: Some("Ask anything, or pick a conversation starter."),
                },

                add_named[Some("messages")] = &gtk::Box {
                    set_orientation: gtk::Orientation::Vertical,

                    #[local_ref]
                    scrolled_window -> gtk::ScrolledWindow {
                        set_vexpand: true,
                        set_hscrollbar_policy: gtk::PolicyType::Never,

                        #[local_ref]
                        message_list -> gtk::Box {
                            set_orientation: gtk::Orientation::Vertical,
                            set_spacing: 0,
                            set_margin_top: 8,
                            set_margin_bottom: 8,
                            set_margin_start: 16,
                            set_margin_end: 16,
                        },
                    },
                },
            },

            // Typing indicator
            gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_halign: gtk::Align::Start,
                set_margin_start: 20,
                set_margin_bottom: 8,
                set_spacing: 8,
                #[watch]
                set_visible: model.session.is_sending(),

                gtk::Spinner {
                    set_spinning: true,
                },
                gtk::Label {
                    set_label: "Assistant is typing...",
                    add_css_class: "dim-label",
                },
            },

            gtk::Separator {
                set_orientation: gtk::Orientation::Horizontal,
            },

            model.input_area.widget().clone(),
        }
    }

    fn init(
        backend: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let messages = FactoryVecDeque::builder()
            .launch(gtk::Box::default())
            .detach();

        let input_area = InputArea::builder()
            .launch(())
            .forward(sender.input_sender(), |output| match output {
                InputAreaOutput::SendMessage { text, image } => ChatViewMsg::Send { text, image },
            });

        let scrolled_window = gtk::ScrolledWindow::new();

        let model = Self {
            backend,
            session: ChatSession::new(),
            messages,
            input_area,
            scrolled_window: scrolled_window.clone(),
            cancel: CancellationToken::new(),
        };

        let message_list = model.messages.widget();
        let widgets = view_output!();

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            ChatViewMsg::Open(id) => {
                if self.session.conversation_id() == Some(id.as_str()) {
                    return;
                }
                self.reset_cancel();
                let request = self.session.open(&id);
                self.sync_messages();
                self.spawn_history(request, &sender);
            }
            ChatViewMsg::Close => {
                self.reset_cancel();
                self.session.close();
                self.sync_messages();
            }
            ChatViewMsg::Send { text, image } => match self.session.begin_send(&text, image) {
                Ok(pending) => {
                    self.sync_messages();
                    let backend = self.backend.clone();
                    let cancel = self.cancel.clone();
                    sender.command(move |out, _| {
                        Box::pin(async move {
                            let response = chat::dispatch_send(backend, pending, cancel).await;
                            let _ = out.send(ChatViewCmd::SendFinished(response));
                        })
                    });
                }
                Err(rejected) => {
                    tracing::debug!("Send rejected: {}", rejected);
                    let draft = rejected.draft;
                    self.input_area.emit(InputAreaMsg::Restore {
                        text: draft.content,
                        image: draft.image,
                    });
                }
            },
            ChatViewMsg::Retry => {
                if let Some(request) = self.session.retry() {
                    self.reset_cancel();
                    self.sync_messages();
                    self.spawn_history(request, &sender);
                }
            }
            ChatViewMsg::DismissError => {
                self.session.dismiss_error();
            }
            ChatViewMsg::Prefill(text) => {
                self.input_area.emit(InputAreaMsg::SetText(text));
            }
        }
        self.sync_sending();
    }

    fn update_cmd(
        &mut self,
        msg: Self::CommandOutput,
        sender: ComponentSender<Self>,
        _root: &Self::Root,
    ) {
        match msg {
            ChatViewCmd::HistoryLoaded(response) => {
                if self.session.finish_history(response) == Outcome::Applied {
                    self.sync_messages();
                }
            }
            ChatViewCmd::SendFinished(response) => {
                let succeeded = matches!(
                    &response.completion,
                    chat::Completion::Finished(Ok(_))
                );
                if self.session.finish_send(response) == Outcome::Applied {
                    self.sync_messages();
                    if succeeded {
                        let _ = sender.output(ChatViewOutput::MessageSent);
                    }
                }
            }
        }
        self.sync_sending();
    }
}

impl ChatView {
    fn page_name(&self) -> &'static str {
        if self.session.is_initializing() {
            "loading"
        } else if self.session.messages().is_empty() {
            "welcome"
        } else {
            "messages"
        }
    }

    /// Cancel whatever is in flight for the previous conversation.
    fn reset_cancel(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    fn spawn_history(&self, request: chat::HistoryRequest, sender: &ComponentSender<Self>) {
        let backend = self.backend.clone();
        let cancel = self.cancel.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let response = chat::load_history(backend, request, cancel).await;
                let _ = out.send(ChatViewCmd::HistoryLoaded(response));
            })
        });
    }

    fn sync_messages(&mut self) {
        let mut guard = self.messages.guard();
        guard.clear();
        for message in self.session.messages() {
            guard.push_back(message.clone());
        }
        drop(guard);

        let adj = self.scrolled_window.vadjustment();
        glib::idle_add_local_once(move || {
            adj.set_value(adj.upper());
        });
    }

    fn sync_sending(&self) {
        self.input_area
            .emit(InputAreaMsg::SetSending(!self.session.can_send()));
    }
}
