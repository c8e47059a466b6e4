mod resource;

pub use resource::draw_resource;
