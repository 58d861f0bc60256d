use crate::view::ViewState;
use gtk4 as gtk;
use gtk4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// What the transcript pane last showed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TranscriptMark {
    sender: String,
    len: usize,
    last_id: Option<String>,
}

impl TranscriptMark {
    fn of(view: &ViewState, sender: &str) -> Self {
        let messages = view.selected_messages();
        Self {
            sender: sender.to_string(),
            len: messages.len(),
            last_id: messages.last().map(|m| m.id.clone()),
        }
    }

    /// Jump to the bottom only for a different conversation or a longer one.
    fn should_scroll(prev: Option<&TranscriptMark>, next: &TranscriptMark) -> bool {
        match prev {
            None => true,
            Some(prev) => prev.sender != next.sender || next.len > prev.len,
        }
    }
}

pub struct ChatView {
    root: gtk::Stack,
    title: gtk::Label,
    subtitle: gtk::Label,
    delete_btn: gtk::Button,
    scroller: gtk::ScrolledWindow,
    messages_box: gtk::Box,
    entry: gtk::Entry,
    send_btn: gtk::Button,
    shown: RefCell<Option<TranscriptMark>>,
}

impl ChatView {
    pub fn new() -> Self {
        let root = gtk::Stack::new();
        root.set_hexpand(true);

        let empty = adw::StatusPage::builder()
            .icon_name("mail-unread-symbolic")
            .title("Select a contact to start")
            .build();
        root.add_named(&empty, Some("empty"));

        let chat = gtk::Box::new(gtk::Orientation::Vertical, 6);
        chat.set_margin_top(8);
        chat.set_margin_bottom(8);
        chat.set_margin_start(8);
        chat.set_margin_end(8);

        // Conversation header
        let header = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let titles = gtk::Box::new(gtk::Orientation::Vertical, 0);
        titles.set_hexpand(true);
        let title = gtk::Label::new(None);
        title.add_css_class("title-4");
        title.set_halign(gtk::Align::Start);
        let subtitle = gtk::Label::new(None);
        subtitle.add_css_class("dim-label");
        subtitle.set_halign(gtk::Align::Start);
        subtitle.set_selectable(true);
        titles.append(&title);
        titles.append(&subtitle);
        let delete_btn = gtk::Button::from_icon_name("user-trash-symbolic");
        delete_btn.set_tooltip_text(Some("Delete conversation"));
        delete_btn.add_css_class("flat");
        header.append(&titles);
        header.append(&delete_btn);
        chat.append(&header);

        let scroller = gtk::ScrolledWindow::builder()
            .vexpand(true)
            .hexpand(true)
            .hscrollbar_policy(gtk::PolicyType::Never)
            .build();
        let messages_box = gtk::Box::new(gtk::Orientation::Vertical, 6);
        scroller.set_child(Some(&messages_box));
        chat.append(&scroller);

        // Input row
        let input_row = gtk::Box::new(gtk::Orientation::Horizontal, 6);
        let entry = gtk::Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("Type a reply…"));
        let send_btn = gtk::Button::with_label("Send");
        send_btn.add_css_class("suggested-action");
        send_btn.set_sensitive(false);
        input_row.append(&entry);
        input_row.append(&send_btn);
        chat.append(&input_row);

        {
            let send_btn = send_btn.clone();
            entry.connect_changed(move |entry| {
                send_btn.set_sensitive(!entry.text().trim().is_empty());
            });
        }

        root.add_named(&chat, Some("chat"));
        root.set_visible_child_name("empty");

        Self {
            root,
            title,
            subtitle,
            delete_btn,
            scroller,
            messages_box,
            entry,
            send_btn,
            shown: RefCell::new(None),
        }
    }

    pub fn widget(&self) -> gtk::Widget {
        self.root.clone().upcast()
    }

    /// `f` gets the entry text; it decides whether the entry is cleared.
    pub fn connect_send<F: Fn(&gtk::Entry) + 'static>(&self, f: F) {
        let send: Rc<dyn Fn(&gtk::Entry)> = Rc::new(f);
        {
            let send = send.clone();
            let entry = self.entry.clone();
            self.send_btn.connect_clicked(move |_| (send)(&entry));
        }
        {
            let send = send.clone();
            self.entry.connect_activate(move |entry| (send)(entry));
        }
    }

    pub fn connect_delete<F: Fn() + 'static>(&self, f: F) {
        self.delete_btn.connect_clicked(move |_| f());
    }

    pub fn render(&self, view: &ViewState) {
        let Some(sender) = view.selected() else {
            self.root.set_visible_child_name("empty");
            self.shown.replace(None);
            return;
        };
        self.root.set_visible_child_name("chat");

        let name = view
            .contact(sender)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| sender.to_string());
        self.title.set_label(&name);
        self.subtitle.set_label(sender);

        let mark = TranscriptMark::of(view, sender);
        let prev = self.shown.replace(Some(mark.clone()));
        if prev.as_ref() == Some(&mark) {
            return;
        }
        let scroll = TranscriptMark::should_scroll(prev.as_ref(), &mark);

        while let Some(child) = self.messages_box.first_child() {
            self.messages_box.remove(&child);
        }
        let messages = view.selected_messages();
        if messages.is_empty() {
            let hint = gtk::Label::new(Some("Start the conversation"));
            hint.add_css_class("dim-label");
            hint.set_margin_top(24);
            self.messages_box.append(&hint);
        }
        for msg in messages {
            let bubble = gtk::Box::new(gtk::Orientation::Vertical, 2);
            bubble.add_css_class("card");
            bubble.set_margin_start(if msg.is_outgoing() { 64 } else { 0 });
            bubble.set_margin_end(if msg.is_outgoing() { 0 } else { 64 });
            bubble.set_halign(if msg.is_outgoing() { gtk::Align::End } else { gtk::Align::Start });

            let text = gtk::Label::new(Some(&msg.text));
            text.set_wrap(true);
            text.set_selectable(true);
            text.set_xalign(0.0);
            text.set_margin_top(6);
            text.set_margin_start(10);
            text.set_margin_end(10);
            let time = gtk::Label::new(Some(&crate::utils::clock_time(&msg.timestamp)));
            time.add_css_class("caption");
            time.add_css_class("dim-label");
            time.set_halign(gtk::Align::End);
            time.set_margin_bottom(4);
            time.set_margin_end(10);

            bubble.append(&text);
            bubble.append(&time);
            self.messages_box.append(&bubble);
        }
        if scroll {
            let adj = self.scroller.vadjustment();
            adj.set_value(adj.upper());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(sender: &str, len: usize, last_id: &str) -> TranscriptMark {
        TranscriptMark {
            sender: sender.into(),
            len,
            last_id: Some(last_id.into()),
        }
    }

    #[test]
    fn first_render_and_new_conversation_scroll() {
        assert!(TranscriptMark::should_scroll(None, &mark("6281", 3, "c")));
        assert!(TranscriptMark::should_scroll(Some(&mark("6281", 3, "c")), &mark("6282", 1, "x")));
    }

    #[test]
    fn growth_scrolls_but_repeat_does_not() {
        let before = mark("6281", 3, "c");
        assert!(TranscriptMark::should_scroll(Some(&before), &mark("6281", 4, "d")));
        assert!(!TranscriptMark::should_scroll(Some(&before), &before.clone()));
    }
}
