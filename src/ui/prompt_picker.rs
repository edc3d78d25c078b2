use std::sync::Arc;

use gtk::prelude::*;
use relm4::prelude::*;

use confab::api::{ApiError, ChatBackend};
use confab::models::topic::topic_label;
use confab::services::prompts::{self, StartersRequest};
use confab::services::{PickerEvent, PromptPicker};

pub struct PromptPickerView {
    backend: Arc<dyn ChatBackend>,
    picker: PromptPicker,
    topic_model: gtk::StringList,
    topic_dropdown: gtk::DropDown,
    topic_handler: glib::SignalHandlerId,
    starter_list: gtk::ListBox,
}

#[derive(Debug)]
pub enum PromptPickerMsg {
    TopicIndexSelected(u32),
    StarterActivated(usize),
}

#[derive(Debug)]
pub enum PromptPickerOutput {
    Event(PickerEvent),
}

#[derive(Debug)]
pub enum PromptPickerCmd {
    Initial {
        topic: String,
        topics: Result<Vec<String>, ApiError>,
        starters: Result<String, ApiError>,
    },
    Starters(String, Result<String, ApiError>),
}

#[relm4::component(pub)]
impl Component for PromptPickerView {
    type Init = Arc<dyn ChatBackend>;
    type Input = PromptPickerMsg;
    type Output = PromptPickerOutput;
    type CommandOutput = PromptPickerCmd;

    view! {
        gtk::Box {
            set_orientation: gtk::Orientation::Vertical,
            set_spacing: 12,
            set_margin_all: 12,
            set_width_request: 280,
            add_css_class: "prompt-picker",

            gtk::Label {
                set_label: "Conversation starters",
                set_halign: gtk::Align::Start,
                add_css_class: "title-4",
            },

            #[local_ref]
            topic_dropdown -> gtk::DropDown {
                set_tooltip_text: Some("Topic"),
            },

            gtk::Label {
                set_halign: gtk::Align::Start,
                set_wrap: true,
                add_css_class: "error",
                add_css_class: "caption",
                #[watch]
                set_visible: model.picker.error().is_some(),
                #[watch]
                set_label: model.picker.error().unwrap_or(""),
            },

            gtk::Spinner {
                set_spinning: true,
                set_halign: gtk::Align::Center,
                #[watch]
                set_visible: model.picker.is_loading_starters(),
            },

            gtk::ScrolledWindow {
                set_vexpand: true,
                set_hscrollbar_policy: gtk::PolicyType::Never,

                #[local_ref]
                starter_list -> gtk::ListBox {
                    set_selection_mode: gtk::SelectionMode::None,
                    add_css_class: "boxed-list",
                },
            },
        }
    }

    fn init(
        backend: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let topic_model = gtk::StringList::new(&[]);
        let topic_dropdown = gtk::DropDown::builder().model(&topic_model).build();
        let starter_list = gtk::ListBox::new();

        let sender_topic = sender.clone();
        let topic_handler = topic_dropdown.connect_selected_notify(move |dropdown| {
            sender_topic.input(PromptPickerMsg::TopicIndexSelected(dropdown.selected()));
        });

        let model = Self {
            backend: backend.clone(),
            picker: PromptPicker::new(),
            topic_model,
            topic_dropdown: topic_dropdown.clone(),
            topic_handler,
            starter_list: starter_list.clone(),
        };

        let widgets = view_output!();

        let sender_starter = sender.clone();
        starter_list.connect_row_activated(move |_, row| {
            sender_starter.input(PromptPickerMsg::StarterActivated(row.index() as usize));
        });

        let topic = model.picker.selected_topic().to_string();
        sender.command(move |out, _| {
            Box::pin(async move {
                let (topics, starters) = prompts::load_initial(backend, topic.clone()).await;
                let _ = out.send(PromptPickerCmd::Initial {
                    topic,
                    topics,
                    starters,
                });
            })
        });

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>, _root: &Self::Root) {
        match msg {
            PromptPickerMsg::TopicIndexSelected(index) => {
                let Some(topic) = self.picker.topics().get(index as usize).cloned() else {
                    return;
                };
                if topic == self.picker.selected_topic() {
                    return;
                }
                let (request, event) = self.picker.select_topic(&topic);
                self.render_starters();
                self.spawn_starters(request, &sender);
                let _ = sender.output(PromptPickerOutput::Event(event));
            }
            PromptPickerMsg::StarterActivated(index) => {
                if let Some(starter) = self.picker.starters().get(index) {
                    let event = self.picker.choose_starter(starter);
                    let _ = sender.output(PromptPickerOutput::Event(event));
                }
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
            PromptPickerCmd::Initial {
                topic,
                topics,
                starters,
            } => {
                let switched = self.picker.finish_topics(topics);
                self.render_topics();
                if let Some((request, event)) = switched {
                    self.spawn_starters(request, &sender);
                    let _ = sender.output(PromptPickerOutput::Event(event));
                }
                if self.picker.finish_starters(&topic, starters) {
                    self.render_starters();
                }
            }
            PromptPickerCmd::Starters(topic, result) => {
                if self.picker.finish_starters(&topic, result) {
                    self.render_starters();
                }
            }
        }
    }
}

impl PromptPickerView {
    fn spawn_starters(&self, request: StartersRequest, sender: &ComponentSender<Self>) {
        let backend = self.backend.clone();
        sender.command(move |out, _| {
            Box::pin(async move {
                let (topic, result) = prompts::fetch_starters(backend, request).await;
                let _ = out.send(PromptPickerCmd::Starters(topic, result));
            })
        });
    }

    fn render_topics(&self) {
        let labels: Vec<String> = self.picker.topics().iter().map(|t| topic_label(t)).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        // Filling the model moves the selection; that is not a user choice
        self.topic_dropdown.block_signal(&self.topic_handler);
        self.topic_model
            .splice(0, self.topic_model.n_items(), &labels);
        if let Some(index) = self
            .picker
            .topics()
            .iter()
            .position(|t| t == self.picker.selected_topic())
        {
            self.topic_dropdown.set_selected(index as u32);
        }
        self.topic_dropdown.unblock_signal(&self.topic_handler);
    }

    fn render_starters(&self) {
        while let Some(child) = self.starter_list.first_child() {
            self.starter_list.remove(&child);
        }
        for starter in self.picker.starters() {
            let label = gtk::Label::builder()
                .label(starter)
                .halign(gtk::Align::Start)
                .xalign(0.0)
                .wrap(true)
                .margin_top(8)
                .margin_bottom(8)
                .margin_start(8)
                .margin_end(8)
                .build();
            let row = gtk::ListBoxRow::builder()
                .child(&label)
                .activatable(true)
                .build();
            self.starter_list.append(&row);
        }
    }
}
