use std::path::PathBuf;

use gtk::prelude::*;
use relm4::prelude::*;

use confab::models::attachment::is_supported_image;
use confab::models::ImageAttachment;

pub struct InputArea {
    buffer: gtk::TextBuffer,
    sending: bool,
    attachment: Option<ImageAttachment>,
    attachment_box: gtk::Box,
    char_count: i32,
}

#[derive(Debug)]
pub enum InputAreaMsg {
    SendClicked,
    SetSending(bool),
    /// Replace the draft, e.g. with a conversation starter.
    SetText(String),
    /// Put back a draft the chat panel could not send.
    Restore {
        text: String,
        image: Option<ImageAttachment>,
    },
    AttachImage,
    RemoveAttachment,
    // Internal
    ImageFileSelected(PathBuf),
    TextChanged,
}

#[derive(Debug)]
pub enum InputAreaOutput {
    SendMessage {
        text: String,
        image: Option<ImageAttachment>,
    },
}

#[relm4::component(pub)]
impl Component for InputArea {
    type Init = ();
    type Input = InputAreaMsg;
    type Output = InputAreaOutput;
    type CommandOutput = ();

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_spacing: 0,

            #[local_ref]
            attachment_box -> gtk::Box {
                set_orientation: gtk::Orientation::Horizontal,
                set_spacing: 6,
                set_halign: gtk::Align::Start,
                set_margin_start: 12,
                set_margin_end: 12,
                set_margin_top: 4,
                #[watch]
                set_visible: model.attachment.is_some(),
                add_css_class: "attachment-strip",
            },

            gtk::Box {
                set_orientation: gtk::Orientation::Vertical,
                set_margin_top: 8,
                set_margin_bottom: 8,
                set_margin_start: 12,
                set_margin_end: 12,
                add_css_class: "input-card",

                gtk::Overlay {
                    set_hexpand: true,

                    gtk::ScrolledWindow {
                        set_hexpand: true,
                        set_max_content_height: 150,
                        set_propagate_natural_height: true,
                        set_min_content_height: 40,

                        #[name = "text_view"]
                        gtk::TextView {
                            set_wrap_mode: gtk::WrapMode::WordChar,
                            set_accepts_tab: false,
                            set_top_margin: 8,
                            set_bottom_margin: 8,
                            set_left_margin: 8,
                            set_right_margin: 8,
                            add_css_class: "input-text-view",
                            #[watch]
                            set_editable: !model.sending,

                            set_buffer: Some(&model.buffer),
                        },
                    },

                    add_overlay = &gtk::Label {
                        set_label: "Type your message... (Shift+Enter for a new line)",
                        set_halign: gtk::Align::Start,
                        set_valign: gtk::Align::Start,
                        set_margin_start: 12,
                        set_margin_top: 8,
                        set_can_target: false,
                        add_css_class: "input-placeholder",
                        #[watch]
                        set_visible: model.char_count == 0,
                    },
                },

                gtk::Box {
                    set_orientation: gtk::Orientation::Horizontal,
                    set_spacing: 4,
                    set_margin_start: 4,
                    set_margin_end: 4,
                    set_margin_bottom: 4,
                    add_css_class: "input-toolbar",

                    gtk::Button {
                        set_icon_name: "mail-attachment-symbolic",
                        set_tooltip_text: Some("Attach image"),
                        set_halign: gtk::Align::Start,
                        add_css_class: "flat",
                        add_css_class: "circular",
                        #[watch]
                        set_sensitive: !model.sending,
                        connect_clicked => InputAreaMsg::AttachImage,
                    },

                    gtk::Box {
                        set_hexpand: true,
                    },

                    gtk::Button {
                        set_icon_name: "go-up-symbolic",
                        set_tooltip_text: Some("Send message (Enter)"),
                        set_halign: gtk::Align::End,
                        add_css_class: "suggested-action",
                        add_css_class: "circular",
                        #[watch]
                        set_sensitive: model.can_send(),
                        connect_clicked => InputAreaMsg::SendClicked,
                    },
                },
            },
        }
    }

    fn init(
        _init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let buffer = gtk::TextBuffer::new(None::<&gtk::TextTagTable>);
        let attachment_box = gtk::Box::new(gtk::Orientation::Horizontal, 6);

        let model = Self {
            buffer: buffer.clone(),
            sending: false,
            attachment: None,
            attachment_box: attachment_box.clone(),
            char_count: 0,
        };

        let widgets = view_output!();

        // Enter sends, Shift+Enter inserts a newline
        let sender_key = sender.clone();
        let key_controller = gtk::EventControllerKey::new();
        key_controller.connect_key_pressed(move |_, key, _code, modifier| {
            let is_enter = key == gtk::gdk::Key::Return || key == gtk::gdk::Key::KP_Enter;
            if is_enter && !modifier.contains(gtk::gdk::ModifierType::SHIFT_MASK) {
                sender_key.input(InputAreaMsg::SendClicked);
                gtk::glib::Propagation::Stop
            } else {
                gtk::glib::Propagation::Proceed
            }
        });
        widgets.text_view.add_controller(key_controller);

        let sender_buf = sender.clone();
        buffer.connect_changed(move |_| {
            sender_buf.input(InputAreaMsg::TextChanged);
        });

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, root: &Self::Root) {
        match msg {
            InputAreaMsg::SendClicked => {
                if !self.can_send() {
                    return;
                }
                let text = self.text().trim().to_string();
                let image = self.attachment.take();

                let _ = sender.output(InputAreaOutput::SendMessage { text, image });
                self.buffer.set_text("");
                self.clear_attachment_box();
            }
            InputAreaMsg::SetSending(sending) => {
                self.sending = sending;
            }
            InputAreaMsg::SetText(text) => {
                self.buffer.set_text(&text);
            }
            InputAreaMsg::Restore { text, image } => {
                self.buffer.set_text(&text);
                if let Some(image) = image {
                    self.show_attachment(image, &sender);
                }
            }
            InputAreaMsg::AttachImage => {
                let dialog = gtk::FileDialog::builder().title("Attach Image").build();

                let filter = gtk::FileFilter::new();
                filter.set_name(Some("Images"));
                filter.add_mime_type("image/png");
                filter.add_mime_type("image/jpeg");
                filter.add_mime_type("image/gif");
                filter.add_mime_type("image/webp");
                let filters = gio::ListStore::new::<gtk::FileFilter>();
                filters.append(&filter);
                dialog.set_filters(Some(&filters));

                let sender_dlg = sender.input_sender().clone();
                if let Some(window) = root.root().and_then(|r| r.downcast::<gtk::Window>().ok()) {
                    dialog.open(Some(&window), None::<&gio::Cancellable>, move |result| {
                        if let Ok(file) = result {
                            if let Some(path) = file.path() {
                                let _ = sender_dlg.send(InputAreaMsg::ImageFileSelected(path));
                            }
                        }
                    });
                }
            }
            InputAreaMsg::RemoveAttachment => {
                self.attachment = None;
                self.clear_attachment_box();
            }
            InputAreaMsg::ImageFileSelected(path) => {
                self.set_attachment(path, &sender);
            }
            InputAreaMsg::TextChanged => {
                self.char_count = self.buffer.char_count();
            }
        }
    }
}

impl InputArea {
    fn text(&self) -> String {
        let start = self.buffer.start_iter();
        let end = self.buffer.end_iter();
        self.buffer.text(&start, &end, false).to_string()
    }

    fn can_send(&self) -> bool {
        !self.sending && (!self.text().trim().is_empty() || self.attachment.is_some())
    }

    fn clear_attachment_box(&self) {
        while let Some(child) = self.attachment_box.first_child() {
            self.attachment_box.remove(&child);
        }
    }

    /// One image per message; a new pick replaces the old one.
    fn set_attachment(&mut self, path: PathBuf, sender: &ComponentSender<Self>) {
        if !is_supported_image(&path) {
            tracing::warn!("Ignoring unsupported image {}", path.display());
            return;
        }
        match ImageAttachment::from_path(&path) {
            Ok(image) => self.show_attachment(image, sender),
            Err(e) => tracing::error!("{:#}", e),
        }
    }

    fn show_attachment(&mut self, image: ImageAttachment, sender: &ComponentSender<Self>) {
        let bytes = glib::Bytes::from(&image.data[..]);
        let texture = match gtk::gdk::Texture::from_bytes(&bytes) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("Failed to create texture: {}", e);
                return;
            }
        };

        self.clear_attachment_box();

        let thumbnail = gtk::Image::from_paintable(Some(&texture));
        thumbnail.set_pixel_size(64);
        thumbnail.add_css_class("attachment-thumbnail");
        self.attachment_box.append(&thumbnail);

        let name_label = gtk::Label::builder()
            .label(image.upload_name())
            .max_width_chars(24)
            .ellipsize(gtk::pango::EllipsizeMode::Middle)
            .build();
        name_label.add_css_class("caption");
        self.attachment_box.append(&name_label);

        let remove_btn = gtk::Button::builder()
            .icon_name("window-close-symbolic")
            .tooltip_text("Remove image")
            .valign(gtk::Align::Center)
            .build();
        remove_btn.add_css_class("flat");
        remove_btn.add_css_class("circular");
        let sender_rm = sender.input_sender().clone();
        remove_btn.connect_clicked(move |_| {
            let _ = sender_rm.send(InputAreaMsg::RemoveAttachment);
        });
        self.attachment_box.append(&remove_btn);

        self.attachment = Some(image);
    }
}
