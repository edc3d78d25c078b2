use gtk::prelude::*;
use relm4::prelude::*;

use confab::models::attachment::decode_data_url;
use confab::models::Message;
use confab::services::conversations::format_message_time;

pub struct MessageWidget {
    pub message: Message,
}

#[derive(Debug)]
pub enum MessageWidgetMsg {}

#[relm4::factory(pub)]
impl FactoryComponent for MessageWidget {
    type Init = Message;
    type Input = MessageWidgetMsg;
    type Output = ();
    type CommandOutput = ();
    type ParentWidget = gtk::Box;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_spacing: 0,
        }
    }

    fn init_model(message: Self::Init, _index: &DynamicIndex, _sender: FactorySender<Self>) -> Self {
        Self { message }
    }

    fn init_widgets(
        &mut self,
        _index: &DynamicIndex,
        root: Self::Root,
        _returned_widget: &<Self::ParentWidget as relm4::factory::FactoryView>::ReturnedWidget,
        _sender: FactorySender<Self>,
    ) -> Self::Widgets {
        let is_user = self.message.is_user();

        let bubble = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(4)
            .build();
        bubble.add_css_class("card");
        if is_user {
            bubble.add_css_class("message-bubble-user");
        } else {
            bubble.add_css_class("message-bubble-assistant");
        }
        if self.message.id.is_pending() {
            bubble.add_css_class("message-pending");
        }
        if self.message.is_agent_failure() {
            bubble.add_css_class("message-error");
        }

        // Sender + time
        let header = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(8)
            .margin_start(8)
            .margin_end(8)
            .margin_top(4)
            .build();

        let role_label = gtk::Label::builder()
            .label(if is_user { "You" } else { "Assistant" })
            .halign(gtk::Align::Start)
            .hexpand(true)
            .build();
        role_label.add_css_class("caption");
        role_label.add_css_class("dim-label");
        header.append(&role_label);

        let time_label = gtk::Label::builder()
            .label(format_message_time(self.message.timestamp))
            .halign(gtk::Align::End)
            .build();
        time_label.add_css_class("caption");
        time_label.add_css_class("dim-label");
        time_label.add_css_class("message-timestamp");
        header.append(&time_label);

        bubble.append(&header);

        let content_box = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(4)
            .margin_start(8)
            .margin_end(8)
            .margin_top(4)
            .margin_bottom(8)
            .build();

        if let Some(url) = &self.message.image_url {
            content_box.append(&image_widget(url));
        }

        if !self.message.content.is_empty() {
            let label = gtk::Label::builder()
                .label(&self.message.content)
                .halign(gtk::Align::Start)
                .xalign(0.0)
                .wrap(true)
                .wrap_mode(gtk::pango::WrapMode::WordChar)
                .selectable(true)
                .build();
            content_box.append(&label);
        }

        bubble.append(&content_box);

        let message_row = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .margin_top(4)
            .margin_bottom(4)
            .margin_start(12)
            .margin_end(12)
            .halign(if is_user {
                gtk::Align::End
            } else {
                gtk::Align::Start
            })
            .build();
        message_row.append(&bubble);
        root.append(&message_row);

        let widgets = view_output!();
        widgets
    }

    fn update(&mut self, msg: Self::Input, _sender: FactorySender<Self>) {
        match msg {}
    }
}

/// Inline thumbnail for `data:` URLs, a plain link for anything else.
fn image_widget(url: &str) -> gtk::Widget {
    if let Some((_mime, data)) = decode_data_url(url) {
        let bytes = glib::Bytes::from(&data);
        match gtk::gdk::Texture::from_bytes(&bytes) {
            Ok(texture) => {
                let picture = gtk::Picture::new();
                picture.set_paintable(Some(&texture));
                picture.set_can_shrink(true);
                picture.set_content_fit(gtk::ContentFit::ScaleDown);
                picture.set_size_request(-1, 200);
                picture.add_css_class("message-image");
                return picture.upcast();
            }
            Err(e) => tracing::warn!("Failed to decode image preview: {}", e),
        }
    }

    let link = gtk::LinkButton::with_label(url, "View image");
    link.set_halign(gtk::Align::Start);
    link.upcast()
}
